use crate::{models::ErrorRecord, Result};

/// Records returned by one fetch, before they become a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRecords {
    pub records: Vec<ErrorRecord>,
    /// Where the backend says the data came from
    pub origin: Option<String>,
}

impl FetchedRecords {
    pub fn new(records: Vec<ErrorRecord>) -> Self {
        Self {
            records,
            origin: None,
        }
    }
}

/// Anything that can hand over the most recent error records
///
/// The HTTP store implements this; tests plug in scripted sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ErrorSource: Send + Sync {
    /// Fetch up to `limit` of the most recent records
    async fn fetch_recent(&self, limit: u32) -> Result<FetchedRecords>;
}
