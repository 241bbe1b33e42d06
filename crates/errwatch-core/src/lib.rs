// Core dashboard logic: classification, filtering, statistics, refresh lifecycle
pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod models;
pub mod providers;
pub mod refresh;
pub mod source;
pub mod time;

pub use aggregator::{aggregate, aggregate_in, DailyBucket, SourceBucket, SourceGroup, Statistics};
pub use classifier::{classify, Category, CategoryAssignment, ColorToken, Integration};
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::Error;
pub use filter::{apply_filters, FilterCriteria};
pub use models::{ErrorRecord, RecordId, Snapshot};
pub use providers::ErrorLogProvider;
pub use refresh::{FetchKind, LoadState, RefreshConfig, RefreshController, RefreshEvent, ResponseOrdering};
pub use source::{ErrorSource, FetchedRecords};

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
