use crate::models::{KeyPolicy, Listing, ListingKey};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Collapse duplicates within one run.
///
/// On a key collision the newer posting wins; ties and older postings keep
/// the listing seen first. Output keeps first-insertion order of the keys.
pub fn dedup(listings: Vec<Listing>, policy: KeyPolicy) -> Vec<Listing> {
    let mut kept: Vec<Listing> = Vec::with_capacity(listings.len());
    let mut index: HashMap<ListingKey, usize> = HashMap::new();

    for listing in listings {
        let key = listing.key(policy);
        match index.get(&key) {
            Some(&slot) => {
                if compare_dates(&listing, &kept[slot]) == Ordering::Greater {
                    debug!(
                        replaced = %kept[slot].ad_id,
                        by = %listing.ad_id,
                        "Newer duplicate replaces kept listing"
                    );
                    kept[slot] = listing;
                } else {
                    debug!(ad_id = %listing.ad_id, "Dropping duplicate listing");
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(listing);
            }
        }
    }

    kept
}

/// Calendar comparison when both dates parse, plain text comparison otherwise
fn compare_dates(a: &Listing, b: &Listing) -> Ordering {
    match (a.posted_on(), b.posted_on()) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.date.cmp(&b.date),
    }
}
