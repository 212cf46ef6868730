use crate::error::StorageError;
use crate::models::Listing;
use crate::storage::{read_listings, write_listings};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every listing ever seen, keyed by ad id, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerDataset {
    entries: Vec<Listing>,
    index: HashMap<String, usize>,
}

impl TrackerDataset {
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        let mut dataset = Self::default();
        dataset.merge(&listings);
        dataset
    }

    /// Insert or overwrite by ad id. The latest run always wins, whatever the dates say.
    pub fn merge(&mut self, listings: &[Listing]) -> MergeStats {
        let mut stats = MergeStats::default();

        for listing in listings {
            match self.index.get(&listing.ad_id) {
                Some(&slot) => {
                    self.entries[slot] = listing.clone();
                    stats.updated += 1;
                }
                None => {
                    self.index.insert(listing.ad_id.clone(), self.entries.len());
                    self.entries.push(listing.clone());
                    stats.added += 1;
                }
            }
        }

        stats
    }

    pub fn get(&self, ad_id: &str) -> Option<&Listing> {
        self.index.get(ad_id).map(|&slot| &self.entries[slot])
    }

    pub fn listings(&self) -> &[Listing] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
}

/// Exclusive handle on the tracker file. Held for a whole load-merge-save
/// cycle; a second handle on the same file fails with [`StorageError::Locked`].
pub struct TrackerStore {
    path: PathBuf,
    _lock: LockFile,
}

impl TrackerStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let lock = LockFile::acquire(&path)?;
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracker; a missing file is an empty tracker
    pub fn load(&self) -> Result<TrackerDataset, StorageError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No tracker yet, starting empty");
            return Ok(TrackerDataset::default());
        }

        let listings = read_listings(&self.path)?;
        debug!(path = %self.path.display(), count = listings.len(), "Loaded tracker");
        Ok(TrackerDataset::from_listings(listings))
    }

    /// Replace the tracker file with `dataset`
    pub fn save(&self, dataset: &TrackerDataset) -> Result<(), StorageError> {
        let tmp = sibling(&self.path, "tmp");
        write_listings(&tmp, dataset.listings())?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        info!(path = %self.path.display(), count = dataset.len(), "Tracker saved");
        Ok(())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(tracker: &Path) -> Result<Self, StorageError> {
        let path = sibling(tracker, "lock");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::Locked(tracker.to_path_buf()),
                _ => StorageError::io(&path, e),
            })?;

        // The lock is the file's existence; the pid only helps whoever finds a stale one
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            warn!(path = %path.display(), error = %e, "Could not record pid in tracker lock");
        }
        Ok(Self { path })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove tracker lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing;

    fn temp_tracker() -> PathBuf {
        std::env::temp_dir()
            .join(format!("listing-scout-{}", uuid::Uuid::new_v4()))
            .join("Tracker_Outputs.csv")
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut tracker = TrackerDataset::from_listings(vec![
            listing("1", "05.01.2024", Some(100), "Berlin"),
            listing("2", "05.01.2024", Some(200), "Bonn"),
        ]);

        // Older date still overwrites: run order decides, not listing date
        let stats = tracker.merge(&[
            listing("2", "01.01.2024", Some(180), "Bonn"),
            listing("3", "01.01.2024", Some(300), "Köln"),
        ]);

        assert_eq!(stats, MergeStats { added: 1, updated: 1 });
        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.get("2").and_then(|l| l.price), Some(180));
        let ids: Vec<_> = tracker.listings().iter().map(|l| l.ad_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let run = vec![
            listing("1", "01.01.2024", Some(100), "Berlin"),
            listing("2", "01.01.2024", Some(200), "Bonn"),
        ];
        let mut tracker = TrackerDataset::from_listings(vec![listing("0", "01.01.2023", None, "Kiel")]);

        tracker.merge(&run);
        let once = tracker.clone();
        tracker.merge(&run);

        assert_eq!(tracker, once);
    }

    #[test]
    fn missing_tracker_loads_empty_and_round_trips() {
        let path = temp_tracker();
        let store = TrackerStore::open(&path).unwrap();
        assert!(store.load().unwrap().is_empty());

        let mut leading_zero = listing("1", "01.01.2024", Some(100), "Dresden");
        leading_zero.postal_code = Some("01234".to_string());
        let mut short = listing("2", "01.01.2024", None, "Dresden");
        short.postal_code = Some("1234".to_string());
        let mut no_postal = listing("3", "Heute", Some(5), "Irgendwo");
        no_postal.postal_code = None;
        no_postal.url = None;
        no_postal.negotiable = true;

        let dataset = TrackerDataset::from_listings(vec![leading_zero, short, no_postal]);
        store.save(&dataset).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(loaded.get("1").and_then(|l| l.postal_code.as_deref()), Some("01234"));
        assert_eq!(loaded.get("2").and_then(|l| l.postal_code.as_deref()), Some("1234"));

        drop(store);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn empty_tracker_file_round_trips() {
        let path = temp_tracker();
        let store = TrackerStore::open(&path).unwrap();

        store.save(&TrackerDataset::default()).unwrap();

        assert!(path.exists());
        assert!(store.load().unwrap().is_empty());
        drop(store);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn second_writer_is_locked_out() {
        let path = temp_tracker();
        let first = TrackerStore::open(&path).unwrap();

        let err = TrackerStore::open(&path).err().unwrap();
        assert!(matches!(err, StorageError::Locked(_)));

        drop(first);
        assert!(TrackerStore::open(&path).is_ok());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn lock_records_owner_pid_and_is_released() {
        let path = temp_tracker();
        let lock = sibling(&path, "lock");
        let store = TrackerStore::open(&path).unwrap();

        let owner = fs::read_to_string(&lock).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());

        drop(store);
        assert!(!lock.exists());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn corrupt_tracker_is_a_storage_error() {
        let path = temp_tracker();
        let store = TrackerStore::open(&path).unwrap();
        fs::write(
            &path,
            "Inserat ID,Datum,Titel,Postleitzahl,Stadt,Preis,VB,Link\n1,01.01.2024,x,1,B,not-a-price,false,\n",
        )
        .unwrap();

        assert!(matches!(store.load(), Err(StorageError::Csv { .. })));
        drop(store);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
