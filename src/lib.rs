pub mod config;
pub mod error;
pub mod listings;
pub mod models;
pub mod report;
pub mod scrapers;
pub mod service;
pub mod storage;

pub use config::{Config, ProviderKind};
pub use error::{CriteriaError, ProviderError, ScoutError, StorageError};
pub use models::{KeyPolicy, Listing, ListingKey, RawListing};
pub use service::{RunOptions, RunOutcome, RunReport, Scout};
