use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::classifier::{classify, CategoryAssignment};

/// Placeholder shown when a record has no node
pub const NODE_PLACEHOLDER: &str = "N/A";
/// Placeholder shown when a record has no message
pub const MESSAGE_PLACEHOLDER: &str = "No message";

/// Record identifier - the store uses integers, but we don't insist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Int(i64::from(id))
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

/// One reported failure event. Never mutated after it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: RecordId,
    pub message: Option<String>,
    /// Exception name or integration name, used for classification
    pub type_label: Option<String>,
    /// Originating subsystem or platform
    pub node: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(id: impl Into<RecordId>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            message: None,
            type_label: None,
            node: None,
            created_at,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_type_label(mut self, type_label: impl Into<String>) -> Self {
        self.type_label = Some(type_label.into());
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Category for this record under the current taxonomy
    pub fn category(&self) -> CategoryAssignment {
        classify(self.type_label.as_deref())
    }

    pub fn node_display(&self) -> &str {
        non_empty(self.node.as_deref()).unwrap_or(NODE_PLACEHOLDER)
    }

    pub fn message_display(&self) -> &str {
        non_empty(self.message.as_deref()).unwrap_or(MESSAGE_PLACEHOLDER)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// The complete record set from one successful fetch
///
/// Sorted newest-first once at construction. Cloning is cheap (the records
/// sit behind an `Arc`), and a snapshot is replaced wholesale, never patched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Arc<[ErrorRecord]>,
    fetched_at: DateTime<Utc>,
    origin: Option<String>,
}

impl Snapshot {
    pub fn new(mut records: Vec<ErrorRecord>, fetched_at: DateTime<Utc>) -> Self {
        // Stable sort keeps the source's order for identical timestamps
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            records: records.into(),
            fetched_at,
            origin: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Utc::now())
    }

    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Where the backend says the data came from, if it said
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// How many records repeat an id already seen in this snapshot
    pub fn duplicate_ids(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records.iter().filter(|r| !seen.insert(&r.id)).count()
    }

    /// Whether two snapshots share the same record allocation
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_snapshot_sorts_newest_first() {
        let snapshot = Snapshot::new(
            vec![
                ErrorRecord::new(1, ts(8)),
                ErrorRecord::new(2, ts(12)),
                ErrorRecord::new(3, ts(10)),
            ],
            ts(13),
        );

        let ids: Vec<_> = snapshot.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(3), RecordId::Int(1)]);
    }

    #[test]
    fn test_snapshot_sort_is_stable_for_ties() {
        let snapshot = Snapshot::new(
            vec![
                ErrorRecord::new("a", ts(9)),
                ErrorRecord::new("b", ts(9)),
                ErrorRecord::new("c", ts(11)),
            ],
            ts(12),
        );
        let ids: Vec<_> = snapshot.records().iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicate_ids_are_counted_not_dropped() {
        let snapshot = Snapshot::new(
            vec![
                ErrorRecord::new(1, ts(8)),
                ErrorRecord::new(1, ts(9)),
                ErrorRecord::new(2, ts(10)),
            ],
            ts(11),
        );
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.duplicate_ids(), 1);
    }

    #[test]
    fn test_placeholders_for_absent_fields() {
        let bare = ErrorRecord::new(1, ts(8));
        assert_eq!(bare.node_display(), "N/A");
        assert_eq!(bare.message_display(), "No message");

        let empty = ErrorRecord::new(2, ts(8)).with_node("").with_message("");
        assert_eq!(empty.node_display(), "N/A");
        assert_eq!(empty.message_display(), "No message");

        let full = ErrorRecord::new(3, ts(8)).with_node("telegram").with_message("boom");
        assert_eq!(full.node_display(), "telegram");
        assert_eq!(full.message_display(), "boom");
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::from(42).to_string(), "42");
        assert_eq!(RecordId::from("uuid-1").to_string(), "uuid-1");
    }
}
