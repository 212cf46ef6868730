use crate::models::RawListing;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

/// One result-list entry on a search page
pub const CONTAINER_SELECTOR: &str = "article.aditem";

/// Default per-page safety net against runaway or malformed pages
pub const DEFAULT_RESULT_CAP: usize = 150;

/// Non-fatal problems met while reading a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// More containers than the cap; the rest were dropped
    ResultCapExceeded { found: usize, cap: usize },
    /// A listing lacked some sub-fields and was kept with them empty
    MissingFields { index: usize, fields: Vec<&'static str> },
}

/// Listings read from one page
#[derive(Debug, Default)]
pub struct Extraction {
    pub listings: Vec<RawListing>,
    /// Containers present on the page, including any beyond the cap
    pub found: usize,
    pub warnings: Vec<ExtractionWarning>,
}

impl Extraction {
    pub fn truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ExtractionWarning::ResultCapExceeded { .. }))
    }
}

struct Selectors {
    container: Selector,
    date: Selector,
    title: Selector,
    location: Selector,
    price: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Self {
        // Constant selectors; parsing cannot fail
        let parse = |css: &str| Selector::parse(css).expect("static selector");
        Self {
            container: parse(CONTAINER_SELECTOR),
            date: parse(".aditem-main--top--right"),
            title: parse(".text-module-begin"),
            location: parse(".aditem-main--top--left"),
            price: parse(".aditem-main--middle--price-shipping--price"),
            anchor: parse("a[href]"),
        }
    }
}

/// Reads raw listing records out of a search result page
pub struct ListingExtractor {
    cap: usize,
    selectors: Selectors,
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_CAP)
    }
}

impl ListingExtractor {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            selectors: Selectors::new(),
        }
    }

    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        let containers: Vec<_> = document.select(&self.selectors.container).collect();
        let found = containers.len();

        if found == 0 {
            info!("No listing containers on page");
            return Extraction::default();
        }

        let mut warnings = Vec::new();
        if found > self.cap {
            warn!(
                found,
                cap = self.cap,
                "More results than the cap allows, narrow the search criteria"
            );
            warnings.push(ExtractionWarning::ResultCapExceeded { found, cap: self.cap });
        }

        let mut listings = Vec::with_capacity(found.min(self.cap));
        for (idx, element) in containers.into_iter().take(self.cap).enumerate() {
            let raw = self.read_listing(element);

            let missing = missing_fields(&raw);
            if !missing.is_empty() {
                warn!(index = idx, fields = ?missing, "Listing is missing fields");
                warnings.push(ExtractionWarning::MissingFields {
                    index: idx,
                    fields: missing,
                });
            }
            listings.push(raw);
        }

        info!("Extracted {} of {} listings from page", listings.len(), found);

        Extraction {
            listings,
            found,
            warnings,
        }
    }

    fn read_listing(&self, element: ElementRef<'_>) -> RawListing {
        let attr = |name: &str| {
            element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let link = attr("data-href").or_else(|| {
            element
                .select(&self.selectors.anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        });

        RawListing {
            ad_id: attr("data-adid"),
            date: text_of(element, &self.selectors.date),
            title: text_of(element, &self.selectors.title),
            location: text_of(element, &self.selectors.location),
            price: text_of(element, &self.selectors.price),
            link,
        }
    }
}

fn text_of(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let node = element.select(selector).next()?;
    let text = node
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn missing_fields(raw: &RawListing) -> Vec<&'static str> {
    [
        ("ad_id", raw.ad_id.is_none()),
        ("date", raw.date.is_none()),
        ("title", raw.title.is_none()),
        ("location", raw.location.is_none()),
        ("price", raw.price.is_none()),
        ("link", raw.link.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, missing)| missing.then_some(name))
    .collect()
}
