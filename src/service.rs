use crate::config::Config;
use crate::error::ScoutError;
use crate::listings::{dedup, Normalizer};
use crate::models::Listing;
use crate::report::{map_markers, write_geojson, Summary};
use crate::scrapers::kleinanzeigen::ListingExtractor;
use crate::scrapers::traits::PageSource;
use crate::scrapers::url::SearchTarget;
use crate::storage::{export_file_name, write_export, TrackerStore};
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Per-run options that don't belong to the search itself
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Label for the export file name; falls back to the query
    pub name: Option<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The page loaded but held no listings. Nothing was written.
    NoResults { url: String },
    Completed(RunReport),
}

#[derive(Debug)]
pub struct RunReport {
    pub url: String,
    pub listings: Vec<Listing>,
    pub export_path: PathBuf,
    pub map_path: Option<PathBuf>,
    pub tracker_size: usize,
    pub summary: Summary,
    /// Listing containers on the page, including any beyond the cap
    pub found: usize,
    /// Per-page cap the run was extracted with
    pub cap: usize,
    /// More listings were on the page than the cap allowed
    pub truncated: bool,
}

/// One scrape pipeline: fetch, extract, normalize, dedup, persist
pub struct Scout {
    config: Config,
    source: Box<dyn PageSource>,
    extractor: ListingExtractor,
    normalizer: Normalizer,
}

impl Scout {
    pub fn new(config: Config, source: Box<dyn PageSource>) -> Self {
        let extractor = ListingExtractor::new(config.result_cap);
        Self {
            config,
            source,
            extractor,
            normalizer: Normalizer::default(),
        }
    }

    /// Replace the normalizer, e.g. to pin "today"
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub async fn run(&self, target: &SearchTarget, options: &RunOptions) -> Result<RunOutcome, ScoutError> {
        let url = target.url();
        info!(url = %url, source = self.source.name(), "Starting scrape");

        let html = self.source.fetch(&url).await?;

        let extraction = self.extractor.extract(&html);
        let found = extraction.found;
        let truncated = extraction.truncated();
        let normalized: Vec<Listing> = extraction
            .listings
            .into_iter()
            .map(|raw| self.normalizer.normalize(raw))
            .collect();
        let listings = dedup(normalized, self.config.key_policy);

        if listings.is_empty() {
            info!(url = %url, "No results found");
            return Ok(RunOutcome::NoResults { url });
        }
        info!(
            kept = listings.len(),
            found,
            policy = %self.config.key_policy,
            "Listings after duplicate removal"
        );

        let criteria = match target {
            SearchTarget::Criteria(criteria) => Some(criteria),
            SearchTarget::Url(_) => None,
        };
        let label = options
            .name
            .clone()
            .or_else(|| criteria.map(|c| c.query().to_string()))
            .unwrap_or_default();
        let file_name = export_file_name(&label, criteria);

        // Hold the tracker lock before anything is written, so a storage
        // failure leaves no export behind
        let store = TrackerStore::open(self.config.tracker_path())?;
        let mut tracker = store.load()?;
        let stats = tracker.merge(&listings);

        let export_path = write_export(&self.config.output_dir, &file_name, &listings)?;
        if let Err(e) = store.save(&tracker) {
            if let Err(remove) = fs::remove_file(&export_path) {
                warn!(path = %export_path.display(), error = %remove, "Could not roll back export");
            }
            return Err(e.into());
        }
        info!(added = stats.added, updated = stats.updated, total = tracker.len(), "Tracker updated");
        let tracker_size = tracker.len();
        drop(store);

        // The map is a convenience; failing to write it does not fail the run
        let map_path = export_path.with_extension("geojson");
        let map_path = match write_geojson(&map_path, &map_markers(&listings)) {
            Ok(()) => Some(map_path),
            Err(e) => {
                warn!(error = %e, "Could not write map");
                None
            }
        };

        Ok(RunOutcome::Completed(RunReport {
            url,
            summary: Summary::from_listings(&listings),
            listings,
            export_path,
            map_path,
            tracker_size,
            found,
            cap: self.config.result_cap,
            truncated,
        }))
    }
}

/// Random pause between `min` and `max`, applied after every run
pub async fn courtesy_delay(min: Duration, max: Duration) {
    let delay = random_delay(min, max);
    info!("Waiting {:.1}s before the next run", delay.as_secs_f64());
    tokio::time::sleep(delay).await;
}

fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::rng().random_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StorageError};
    use crate::scrapers::kleinanzeigen::fixtures::{article, page, Ad};
    use crate::scrapers::types::{Category, SearchCriteria};
    use crate::storage::tracker::TrackerStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct CannedPage(Result<String, ProviderError>);

    #[async_trait]
    impl PageSource for CannedPage {
        async fn fetch(&self, _url: &str) -> Result<String, ProviderError> {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn temp_config() -> Config {
        Config {
            output_dir: std::env::temp_dir().join(format!("listing-scout-{}", uuid::Uuid::new_v4())),
            ..Config::default()
        }
    }

    fn scout(config: &Config, html: String) -> Scout {
        Scout::new(config.clone(), Box::new(CannedPage(Ok(html))))
            .with_normalizer(Normalizer::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()))
    }

    fn target() -> SearchTarget {
        SearchTarget::Criteria(
            SearchCriteria::builder("golf", Category::Vehicles)
                .build()
                .unwrap(),
        )
    }

    fn three_ads() -> String {
        page(&[
            article(&Ad {
                id: "101",
                date: "01.01.2024",
                title: "Golf VII",
                location: "10115 Berlin",
                price: "15.000 € VB",
            }),
            article(&Ad {
                id: "102",
                date: "02.01.2024",
                title: "Golf VII GTI",
                location: "10117 Berlin",
                price: "15.000 €",
            }),
            article(&Ad {
                id: "103",
                date: "Heute, 10:15",
                title: "Golf Variant",
                location: "20095 Hamburg",
                price: "20.000 €",
            }),
        ])
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::NoResults { url } => panic!("no results for {}", url),
        }
    }

    #[tokio::test]
    async fn end_to_end_run_dedups_and_persists() {
        let config = temp_config();

        let report = completed(
            scout(&config, three_ads())
                .run(&target(), &RunOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(report.listings.len(), 2);
        assert_eq!(report.listings[0].ad_id, "102");
        assert!(!report.listings[0].negotiable);
        assert_eq!(report.listings[1].ad_id, "103");
        assert_eq!(report.listings[1].date, "03.01.2024");
        assert_eq!(report.tracker_size, 2);
        assert_eq!(report.summary.min, Some(15_000));
        assert_eq!(report.summary.max, Some(20_000));
        assert!(!report.truncated);
        assert_eq!(report.found, 3);
        assert_eq!(
            report.export_path,
            config.output_dir.join("golf_alle_alle.csv")
        );
        assert!(report.export_path.exists());
        assert!(report.map_path.as_ref().is_some_and(|p| p.exists()));
        assert!(!config.tracker_path().with_extension("csv.lock").exists());

        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn tracker_accumulates_across_runs() {
        let config = temp_config();
        scout(&config, three_ads())
            .run(&target(), &RunOptions::default())
            .await
            .unwrap();

        let second_page = page(&[
            article(&Ad {
                id: "103",
                date: "04.01.2024",
                title: "Golf Variant",
                location: "20095 Hamburg",
                price: "18.500 € VB",
            }),
            article(&Ad {
                id: "104",
                date: "04.01.2024",
                title: "Golf Cabrio",
                location: "01067 Dresden",
                price: "7.000 €",
            }),
        ]);
        let options = RunOptions {
            name: Some("Golf Nachlauf".to_string()),
        };
        let report = completed(scout(&config, second_page).run(&target(), &options).await.unwrap());

        assert_eq!(report.tracker_size, 3);
        assert_eq!(
            report.export_path,
            config.output_dir.join("Golf_Nachlauf_alle_alle.csv")
        );

        let store = TrackerStore::open(config.tracker_path()).unwrap();
        let tracker = store.load().unwrap();
        let ids: Vec<_> = tracker.listings().iter().map(|l| l.ad_id.as_str()).collect();
        assert_eq!(ids, vec!["102", "103", "104"]);
        assert_eq!(tracker.get("103").and_then(|l| l.price), Some(18_500));
        assert!(tracker.get("103").is_some_and(|l| l.negotiable));
        assert_eq!(
            tracker.get("104").and_then(|l| l.postal_code.as_deref()),
            Some("01067")
        );
        drop(store);

        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn rerunning_identical_page_leaves_tracker_unchanged() {
        let config = temp_config();
        let first = completed(scout(&config, three_ads()).run(&target(), &RunOptions::default()).await.unwrap());
        let before = fs::read_to_string(config.tracker_path()).unwrap();

        let second = completed(scout(&config, three_ads()).run(&target(), &RunOptions::default()).await.unwrap());
        let after = fs::read_to_string(config.tracker_path()).unwrap();

        assert_eq!(first.tracker_size, second.tracker_size);
        assert_eq!(before, after);
        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn empty_page_reports_no_results_and_writes_nothing() {
        let config = temp_config();

        let outcome = scout(&config, page(&[]))
            .run(&SearchTarget::Url("https://www.kleinanzeigen.de/s-autos/k0".to_string()), &RunOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::NoResults { ref url } if url == "https://www.kleinanzeigen.de/s-autos/k0"
        ));
        assert!(!config.output_dir.exists());
    }

    #[tokio::test]
    async fn provider_failure_stops_the_run() {
        let config = temp_config();
        let scout = Scout::new(config.clone(), Box::new(CannedPage(Err(ProviderError::HttpError(429)))));

        let err = scout.run(&target(), &RunOptions::default()).await.unwrap_err();

        assert!(matches!(err, ScoutError::Provider(ProviderError::HttpError(429))));
        assert!(!config.output_dir.exists());
    }

    #[tokio::test]
    async fn locked_tracker_is_a_storage_failure() {
        let config = temp_config();
        let holder = TrackerStore::open(config.tracker_path()).unwrap();

        let err = scout(&config, three_ads())
            .run(&target(), &RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScoutError::Storage(StorageError::Locked(_))));
        assert!(!config.output_dir.join("golf_alle_alle.csv").exists());
        drop(holder);
        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn unreadable_tracker_leaves_no_export() {
        let config = temp_config();
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(
            config.tracker_path(),
            "Inserat ID,Datum,Titel,Postleitzahl,Stadt,Preis,VB,Link\n1,01.01.2024,x,1,B,kein Preis,false,\n",
        )
        .unwrap();

        let err = scout(&config, three_ads())
            .run(&target(), &RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScoutError::Storage(StorageError::Csv { .. })));
        assert!(!config.output_dir.join("golf_alle_alle.csv").exists());
        assert!(!config.output_dir.join("golf_alle_alle.geojson").exists());
        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn report_carries_cap_not_deduplicated_count() {
        let config = Config {
            result_cap: 2,
            ..temp_config()
        };

        // Both kept ads collapse into one, the third is beyond the cap
        let report = completed(
            scout(&config, three_ads())
                .run(&target(), &RunOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(report.listings.len(), 1);
        assert_eq!(report.found, 3);
        assert_eq!(report.cap, 2);
        assert!(report.truncated);
        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[test]
    fn random_delay_stays_within_bounds() {
        let min = Duration::from_secs(3);
        let max = Duration::from_secs(7);
        for _ in 0..100 {
            let d = random_delay(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(random_delay(max, min), max);
    }
}
