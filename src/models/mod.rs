use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format the marketplace uses for posting dates
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Prefix of ad ids made up locally for listings the marketplace gave no id
pub const SYNTHETIC_ID_PREFIX: &str = "anon-";

/// One listing as it was read from the page, before any cleanup.
/// Every field is optional: a missing node never drops the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub ad_id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub link: Option<String>,
}

/// Normalized listing record.
///
/// The serde names are the column headers of the export and tracker
/// spreadsheets, so files from older runs keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "Inserat ID")]
    pub ad_id: String,
    #[serde(rename = "Datum")]
    pub date: String,
    #[serde(rename = "Titel")]
    pub title: String,
    /// Kept as text: leading zeros are significant.
    #[serde(rename = "Postleitzahl")]
    pub postal_code: Option<String>,
    #[serde(rename = "Stadt")]
    pub city: String,
    #[serde(rename = "Preis")]
    pub price: Option<u64>,
    #[serde(rename = "VB")]
    pub negotiable: bool,
    #[serde(rename = "Link")]
    pub url: Option<String>,
}

impl Listing {
    /// Posting date as a calendar date, when the text is in `dd.mm.yyyy` form
    pub fn posted_on(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }

    /// Whether the ad id came from the marketplace rather than being synthesized
    pub fn has_marketplace_id(&self) -> bool {
        !self.ad_id.is_empty() && !self.ad_id.starts_with(SYNTHETIC_ID_PREFIX)
    }

    pub fn key(&self, policy: KeyPolicy) -> ListingKey {
        match policy {
            KeyPolicy::AdIdPreferred if self.has_marketplace_id() => {
                ListingKey::AdId(self.ad_id.clone())
            }
            _ => ListingKey::PriceCity {
                price: self.price,
                city: self.city.clone(),
            },
        }
    }
}

/// Identity used to spot duplicates within a single run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingKey {
    AdId(String),
    PriceCity { price: Option<u64>, city: String },
}

/// How duplicates are keyed within a run.
///
/// `PriceCity` matches the historical behaviour: two different ads with the
/// same price in the same city are treated as one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyPolicy {
    #[default]
    PriceCity,
    AdIdPreferred,
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::PriceCity => f.write_str("price-city"),
            KeyPolicy::AdIdPreferred => f.write_str("ad-id-preferred"),
        }
    }
}

#[cfg(test)]
pub(crate) fn listing(ad_id: &str, date: &str, price: Option<u64>, city: &str) -> Listing {
    Listing {
        ad_id: ad_id.to_string(),
        date: date.to_string(),
        title: format!("Anzeige {}", ad_id),
        postal_code: Some("10115".to_string()),
        city: city.to_string(),
        price,
        negotiable: false,
        url: Some(format!("https://www.kleinanzeigen.de/s-anzeige/{}", ad_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posted_on_parses_day_month_year() {
        let l = listing("1", "02.01.2024", Some(1), "Berlin");
        assert_eq!(l.posted_on(), NaiveDate::from_ymd_opt(2024, 1, 2));

        let l = listing("1", "vor 3 Tagen", Some(1), "Berlin");
        assert_eq!(l.posted_on(), None);
    }

    #[test]
    fn key_policy_selects_identity() {
        let l = listing("42", "01.01.2024", Some(15000), "Berlin");
        assert_eq!(
            l.key(KeyPolicy::PriceCity),
            ListingKey::PriceCity {
                price: Some(15000),
                city: "Berlin".to_string()
            }
        );
        assert_eq!(
            l.key(KeyPolicy::AdIdPreferred),
            ListingKey::AdId("42".to_string())
        );

        let anonymous = listing("", "01.01.2024", Some(15000), "Berlin");
        assert!(matches!(
            anonymous.key(KeyPolicy::AdIdPreferred),
            ListingKey::PriceCity { .. }
        ));

        let synthesized = listing(
            "anon-10115-Berlin-15000",
            "01.01.2024",
            Some(15000),
            "Berlin",
        );
        assert!(!synthesized.has_marketplace_id());
        assert!(matches!(
            synthesized.key(KeyPolicy::AdIdPreferred),
            ListingKey::PriceCity { .. }
        ));
    }
}
