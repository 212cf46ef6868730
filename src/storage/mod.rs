pub mod export;
pub mod tracker;

pub use export::{export_file_name, write_export};
pub use tracker::{TrackerDataset, TrackerStore};

use crate::error::StorageError;
use crate::models::Listing;
use std::path::Path;

/// Column headers shared by the export and tracker spreadsheets
pub const COLUMNS: [&str; 8] = [
    "Inserat ID",
    "Datum",
    "Titel",
    "Postleitzahl",
    "Stadt",
    "Preis",
    "VB",
    "Link",
];

/// Write `listings` as a spreadsheet, header row included even when empty
pub(crate) fn write_listings(path: &Path, listings: &[Listing]) -> Result<(), StorageError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| StorageError::csv(path, e))?;

    writer
        .write_record(COLUMNS)
        .map_err(|e| StorageError::csv(path, e))?;
    for listing in listings {
        writer
            .serialize(listing)
            .map_err(|e| StorageError::csv(path, e))?;
    }
    writer.flush().map_err(|e| StorageError::io(path, e))?;

    Ok(())
}

pub(crate) fn read_listings(path: &Path) -> Result<Vec<Listing>, StorageError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| StorageError::csv(path, e))?;

    reader
        .deserialize::<Listing>()
        .collect::<Result<Vec<Listing>, _>>()
        .map_err(|e| StorageError::csv(path, e))
}
