use crate::models::Listing;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::path::Path;

/// Price statistics of one run. Listings without a price are counted but
/// left out of the price figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub priced: usize,
    pub average: Option<f64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl Summary {
    pub fn from_listings(listings: &[Listing]) -> Self {
        let prices: Vec<u64> = listings.iter().filter_map(|l| l.price).collect();
        let average = if prices.is_empty() {
            None
        } else {
            Some(prices.iter().map(|&p| p as f64).sum::<f64>() / prices.len() as f64)
        };

        Self {
            count: listings.len(),
            priced: prices.len(),
            average,
            min: prices.iter().copied().min(),
            max: prices.iter().copied().max(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Anzahl Inserate: {}", self.count)?;
        match (self.average, self.min, self.max) {
            (Some(avg), Some(min), Some(max)) => {
                writeln!(f, "Durchschnittspreis: {:.2} €", avg)?;
                writeln!(f, "Minimaler Preis: {} €", min)?;
                write!(f, "Maximaler Preis: {} €", max)
            }
            _ => write!(f, "Keine Preisangaben"),
        }
    }
}

/// Approximate centre of each German postal zone, by leading digit
const POSTAL_ZONES: [(f64, f64); 10] = [
    (51.05, 13.40), // 0: Sachsen, Thüringen south-east
    (52.50, 13.40), // 1: Berlin, Brandenburg
    (53.55, 10.00), // 2: Hamburg, Schleswig-Holstein
    (52.37, 9.73),  // 3: Niedersachsen, Nordhessen
    (51.23, 6.78),  // 4: Düsseldorf, Ruhr
    (50.94, 6.96),  // 5: Köln, Rheinland
    (50.11, 8.68),  // 6: Frankfurt, Saarland
    (48.78, 9.18),  // 7: Stuttgart
    (48.14, 11.58), // 8: München
    (49.45, 11.08), // 9: Nürnberg, Franken
];

/// One pin on the results map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub price: Option<u64>,
    pub link: Option<String>,
}

/// Markers for all listings whose postal code maps to a zone
pub fn map_markers(listings: &[Listing]) -> Vec<MapMarker> {
    listings
        .iter()
        .filter_map(|listing| {
            let zone = listing
                .postal_code
                .as_deref()?
                .chars()
                .next()?
                .to_digit(10)?;
            let (latitude, longitude) = POSTAL_ZONES[zone as usize];

            Some(MapMarker {
                latitude,
                longitude,
                title: listing.title.clone(),
                price: listing.price,
                link: listing.url.clone(),
            })
        })
        .collect()
}

/// Write markers as a GeoJSON FeatureCollection
pub fn write_geojson(path: &Path, markers: &[MapMarker]) -> Result<()> {
    let features: Vec<_> = markers
        .iter()
        .map(|m| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [m.longitude, m.latitude],
                },
                "properties": {
                    "title": m.title,
                    "price": m.price,
                    "link": m.link,
                },
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    let body = serde_json::to_string_pretty(&collection)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write map to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing;

    #[test]
    fn summary_ignores_missing_prices() {
        let listings = vec![
            listing("1", "01.01.2024", Some(10_000), "Berlin"),
            listing("2", "01.01.2024", None, "Berlin"),
            listing("3", "01.01.2024", Some(20_000), "Hamburg"),
        ];

        let summary = Summary::from_listings(&listings);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.priced, 2);
        assert_eq!(summary.average, Some(15_000.0));
        assert_eq!(summary.min, Some(10_000));
        assert_eq!(summary.max, Some(20_000));
        assert_eq!(
            summary.to_string(),
            "Anzahl Inserate: 3\nDurchschnittspreis: 15000.00 €\nMinimaler Preis: 10000 €\nMaximaler Preis: 20000 €"
        );
    }

    #[test]
    fn summary_without_prices() {
        let summary = Summary::from_listings(&[listing("1", "01.01.2024", None, "Berlin")]);

        assert_eq!(summary.average, None);
        assert_eq!(summary.to_string(), "Anzahl Inserate: 1\nKeine Preisangaben");
    }

    #[test]
    fn markers_need_a_postal_code() {
        let mut munich = listing("1", "01.01.2024", Some(1), "München");
        munich.postal_code = Some("80331".to_string());
        let mut unknown = listing("2", "01.01.2024", Some(2), "Irgendwo");
        unknown.postal_code = None;
        let mut odd = listing("3", "01.01.2024", Some(3), "Wien");
        odd.postal_code = Some("A-1010".to_string());

        let markers = map_markers(&[munich, unknown, odd]);

        assert_eq!(markers.len(), 1);
        assert_eq!((markers[0].latitude, markers[0].longitude), (48.14, 11.58));
        assert_eq!(markers[0].title, "Anzeige 1");
    }

    #[test]
    fn geojson_lists_every_marker() {
        let path = std::env::temp_dir().join(format!("listing-scout-{}.geojson", uuid::Uuid::new_v4()));
        let markers = map_markers(&[listing("1", "01.01.2024", Some(9), "Berlin")]);

        write_geojson(&path, &markers).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["features"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["features"][0]["geometry"]["coordinates"][1], 52.5);
        assert_eq!(value["features"][0]["properties"]["price"], 9);
        std::fs::remove_file(path).unwrap();
    }
}
