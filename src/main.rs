use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use listing_scout::config::{Config, ProviderKind};
use listing_scout::models::KeyPolicy;
use listing_scout::scrapers::types::{BodyType, Category, Region, SearchCriteria, SellerType};
use listing_scout::scrapers::{BrowserPageSource, HttpPageSource, PageSource, SearchTarget};
use listing_scout::service::{courtesy_delay, RunOptions, RunOutcome, Scout};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listing-scout", version, about = "Collect classifieds listings into a spreadsheet tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the search URL without fetching anything
    Link(TargetArgs),
    /// Scrape once, export the results and update the tracker
    Run(RunArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Pre-built search link; used verbatim, criteria flags are ignored
    #[arg(long)]
    url: Option<String>,

    /// Free-text search
    query: Option<String>,

    #[arg(long, value_enum, default_value_t = Category::Vehicles)]
    category: Category,

    #[arg(long, value_enum)]
    region: Option<Region>,

    #[arg(long, value_enum)]
    seller: Option<SellerType>,

    #[arg(long)]
    price_min: Option<u32>,
    #[arg(long)]
    price_max: Option<u32>,

    /// First registration year
    #[arg(long)]
    year_min: Option<u32>,
    #[arg(long)]
    year_max: Option<u32>,

    /// Mileage in km
    #[arg(long)]
    km_min: Option<u32>,
    #[arg(long)]
    km_max: Option<u32>,

    /// Power in PS
    #[arg(long)]
    power_min: Option<u32>,
    #[arg(long)]
    power_max: Option<u32>,

    #[arg(long, value_enum)]
    body: Option<BodyType>,
}

impl TargetArgs {
    fn into_target(self) -> Result<SearchTarget> {
        if let Some(url) = self.url {
            return Ok(SearchTarget::Url(url));
        }

        let criteria = SearchCriteria::builder(self.query.unwrap_or_default(), self.category)
            .region(self.region)
            .seller(self.seller)
            .price(self.price_min, self.price_max)
            .year(self.year_min, self.year_max)
            .mileage(self.km_min, self.km_max)
            .power(self.power_min, self.power_max)
            .body(self.body)
            .build()
            .context("Invalid search criteria")?;

        Ok(SearchTarget::Criteria(criteria))
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Label for the export file, e.g. the vehicle brand
    #[arg(long)]
    name: Option<String>,

    /// Wait until this local time before scraping ("2024-05-01 06:30")
    #[arg(long, value_parser = parse_start_time)]
    start_at: Option<NaiveDateTime>,

    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,

    #[arg(long, value_enum)]
    key_policy: Option<KeyPolicy>,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn parse_start_time(raw: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM, got {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Link(target) => {
            let target = target.into_target()?;
            println!("Generierter Link: {}", target.url());
            Ok(())
        }
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(policy) = args.key_policy {
        config.key_policy = policy;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let target = args.target.into_target()?;

    if let Some(start_at) = args.start_at {
        let wait = start_at - Local::now().naive_local();
        if let Ok(wait) = wait.to_std() {
            info!("Scraper starts in {} seconds...", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    let source: Box<dyn PageSource> = match config.provider {
        ProviderKind::Http => Box::new(HttpPageSource::new(config.fetch_timeout)?),
        ProviderKind::Browser => Box::new(BrowserPageSource::new(config.fetch_timeout, config.render_wait)?),
    };

    let (delay_min, delay_max) = (config.delay_min, config.delay_max);
    let scout = Scout::new(config, source);
    let options = RunOptions { name: args.name };

    match scout.run(&target, &options).await.context("Scrape failed")? {
        RunOutcome::NoResults { url } => {
            println!("Keine Ergebnisse gefunden für {}", url);
        }
        RunOutcome::Completed(report) => {
            if report.truncated {
                println!(
                    "Mehr als {} Ergebnisse gefunden ({} auf der Seite). Bitte die Suchkriterien eingrenzen.",
                    report.cap, report.found
                );
            }
            for (i, listing) in report.listings.iter().enumerate() {
                let price = listing
                    .price
                    .map(|p| format!("{} €", p))
                    .unwrap_or_else(|| "k. A.".to_string());
                let vb = if listing.negotiable { " VB" } else { "" };
                println!(
                    "{}. {} ({}{}) - {} {} - {}",
                    i + 1,
                    listing.title,
                    price,
                    vb,
                    listing.postal_code.as_deref().unwrap_or("-"),
                    listing.city,
                    listing.date
                );
            }
            println!();
            println!("{}", report.summary);
            println!("Daten gespeichert unter {}", report.export_path.display());
            println!("Tracker aktualisiert ({} Inserate)", report.tracker_size);
            if let Some(map) = report.map_path {
                println!("Karte: {}", map.display());
            }
        }
    }

    courtesy_delay(delay_min, delay_max).await;
    Ok(())
}
