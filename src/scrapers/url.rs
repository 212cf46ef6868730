use crate::scrapers::types::{IntRange, SearchCriteria};
use urlencoding::encode;

/// Marketplace origin, also used to absolutize relative links
pub const ORIGIN: &str = "https://www.kleinanzeigen.de";

/// What a run searches: structured criteria or a link the user already built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Criteria(SearchCriteria),
    Url(String),
}

impl SearchTarget {
    /// The URL a run will fetch. Custom URLs are used verbatim.
    pub fn url(&self) -> String {
        match self {
            SearchTarget::Criteria(criteria) => build_url(criteria),
            SearchTarget::Url(url) => url.clone(),
        }
    }
}

/// Build the search URL for `criteria`. Absent optional fields are omitted.
pub fn build_url(criteria: &SearchCriteria) -> String {
    let category = criteria.category();
    let mut url = format!("{}/s-{}/anzeige:angebote", ORIGIN, category.slug());

    let query = criteria.query().split_whitespace().collect::<Vec<_>>().join("-");
    if !query.is_empty() {
        url.push('/');
        url.push_str(&encode(&query));
    }

    if let Some(region) = criteria.region() {
        url.push('/');
        url.push_str(region.slug());
    }
    if let Some(seller) = criteria.seller() {
        url.push_str("/anbieter:");
        url.push_str(seller.slug());
    }
    if !criteria.price().is_empty() {
        let price = criteria.price();
        url.push_str(&format!(
            "/preis:{}:{}",
            encode(&bound(price.min())),
            encode(&bound(price.max()))
        ));
    }

    push_attribute_range(&mut url, "autos.ez_i", criteria.year());
    push_attribute_range(&mut url, "autos.km_i", criteria.mileage());
    push_attribute_range(&mut url, "autos.power_i", criteria.power());
    if let Some(body) = criteria.body() {
        url.push_str("+autos.typ_s:");
        url.push_str(body.slug());
    }

    url.push('/');
    url.push_str(category.suffix());
    url
}

fn bound(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// Attribute filters are joined with `+` and carry an encoded "min,max" pair
fn push_attribute_range(url: &mut String, attribute: &str, range: IntRange) {
    if range.is_empty() {
        return;
    }
    let token = format!("{},{}", bound(range.min()), bound(range.max()));
    url.push('+');
    url.push_str(attribute);
    url.push(':');
    url.push_str(&encode(&token));
}
