use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a page source. The pipeline stops the current run on any of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("timed out waiting for the page")]
    Timeout,

    #[error("marketplace answered with HTTP {0}")]
    HttpError(u16),

    #[error("page loaded but no listing container appeared")]
    BlockedOrEmpty,
}

/// Tracker or export file failures. Always fatal for the run.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("tracker {0} is locked by another run")]
    Locked(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed spreadsheet {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Invalid search criteria, rejected at construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("{field}: minimum {min} is greater than maximum {max}")]
    InvertedRange {
        field: &'static str,
        min: u32,
        max: u32,
    },

    #[error("year {0} is before 1900")]
    YearTooEarly(u32),
}

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("page source failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}
