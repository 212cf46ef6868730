use crate::models::{Listing, RawListing, DATE_FORMAT, SYNTHETIC_ID_PREFIX};
use crate::scrapers::url::ORIGIN;
use chrono::{Duration, Local, NaiveDate};
use tracing::warn;

/// Price-text marker for "Verhandlungsbasis" (price negotiable)
pub const NEGOTIABLE_MARKER: &str = "VB";

/// Turns raw page text into typed listings. Never fails: unreadable
/// fields fall back to empty or absent values.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    today: NaiveDate,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl Normalizer {
    /// `today` is the date substituted for relative dates like "Heute"
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn normalize(&self, raw: RawListing) -> Listing {
        let price_text = raw.price.unwrap_or_default();
        let price = parse_price(&price_text);
        let negotiable = price_text.contains(NEGOTIABLE_MARKER);

        let (postal_code, city) = split_location(raw.location.as_deref().unwrap_or_default());
        let date = self.resolve_date(raw.date.as_deref().unwrap_or_default());
        let url = raw.link.as_deref().map(absolutize);

        let ad_id = raw
            .ad_id
            .or_else(|| url.as_deref().and_then(id_from_link))
            .unwrap_or_else(|| synthetic_id(postal_code.as_deref(), &city, price));

        Listing {
            ad_id,
            date,
            title: raw.title.unwrap_or_default(),
            postal_code,
            city,
            price,
            negotiable,
            url,
        }
    }

    fn resolve_date(&self, text: &str) -> String {
        let text = text.trim();
        let lower = text.to_lowercase();
        let day = if is_relative(&lower, "heute") {
            Some(self.today)
        } else if is_relative(&lower, "gestern") {
            Some(self.today - Duration::days(1))
        } else {
            None
        };

        match day {
            Some(day) => day.format(DATE_FORMAT).to_string(),
            None => text.to_string(),
        }
    }
}

// "heute" or "heute, 14:02"
fn is_relative(lower: &str, word: &str) -> bool {
    lower == word
        || lower
            .strip_prefix(word)
            .is_some_and(|rest| rest.starts_with(','))
}

/// All digits of the price text read as one number ("15.000 € VB" is 15000)
pub fn parse_price(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    match digits.parse() {
        Ok(price) => Some(price),
        Err(e) => {
            warn!(price_text = text, error = %e, "Price out of range, dropping it");
            None
        }
    }
}

/// Split "10115 Berlin Mitte" into postal code and city.
/// Without a space the whole text is the city.
pub fn split_location(text: &str) -> (Option<String>, String) {
    let text = text.trim();
    match text.split_once(' ') {
        Some((postal, city)) => (Some(postal.to_string()), city.trim().to_string()),
        None => (None, text.to_string()),
    }
}

fn absolutize(link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{}{}", ORIGIN, link)
    } else {
        format!("{}/{}", ORIGIN, link)
    }
}

// "/s-anzeige/bmw-320d/2712345678-216-3331" -> "2712345678"
fn id_from_link(url: &str) -> Option<String> {
    let last = url.trim_end_matches('/').rsplit('/').next()?;
    let id = last.split('-').next()?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn synthetic_id(postal_code: Option<&str>, city: &str, price: Option<u64>) -> String {
    format!(
        "{}{}-{}-{}",
        SYNTHETIC_ID_PREFIX,
        postal_code.unwrap_or_default(),
        city.replace(' ', "_"),
        price.map(|p| p.to_string()).unwrap_or_default()
    )
}
