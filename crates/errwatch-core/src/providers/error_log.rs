// Error-log provider - bridges the HTTP client with the ErrorSource trait
use async_trait::async_trait;
use errwatch_api::{ErrorLogClient, WireErrorLog, WireId};
use tracing::{debug, warn};

use crate::{
    models::{ErrorRecord, RecordId},
    source::{ErrorSource, FetchedRecords},
    time::parse_timestamp,
    Result,
};

/// Wrapper around ErrorLogClient that implements ErrorSource
pub struct ErrorLogProvider {
    client: ErrorLogClient,
}

impl ErrorLogProvider {
    pub fn new(client: ErrorLogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ErrorSource for ErrorLogProvider {
    async fn fetch_recent(&self, limit: u32) -> Result<FetchedRecords> {
        let batch = self.client.fetch_recent(limit).await?;
        let received = batch.records.len();

        let records: Vec<ErrorRecord> = batch.records.into_iter().filter_map(wire_to_record).collect();

        if records.len() < received {
            warn!(
                "Dropped {} of {} records without a usable id or timestamp",
                received - records.len(),
                received
            );
        }
        debug!("Fetched {} error records", records.len());

        Ok(FetchedRecords {
            records,
            origin: batch.source,
        })
    }
}

/// Convert a wire row into our record model
///
/// Missing message, type and node are fine. A row without an id or a
/// parseable timestamp can't be placed in the view and is dropped.
fn wire_to_record(wire: WireErrorLog) -> Option<ErrorRecord> {
    let id = match wire.id? {
        WireId::Int(id) => RecordId::Int(id),
        WireId::Text(id) => RecordId::Text(id),
    };

    let created_at = match wire.created_at.as_deref().and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            debug!("Record {} has no usable created_at: {:?}", id, wire.created_at);
            return None;
        }
    };

    Some(ErrorRecord {
        id,
        message: wire.error_message,
        type_label: wire.type_error,
        node: wire.node,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_wire_to_record_keeps_absent_optionals() {
        let wire = WireErrorLog {
            id: Some(WireId::Int(12)),
            created_at: Some("2024-05-01T10:00:00+00:00".into()),
            ..WireErrorLog::default()
        };

        let record = wire_to_record(wire).unwrap();
        assert_eq!(record.id, RecordId::Int(12));
        assert_eq!(record.message, None);
        assert_eq!(record.type_label, None);
        assert_eq!(record.node, None);
        assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_wire_to_record_maps_fields() {
        let wire = WireErrorLog {
            id: Some(WireId::Text("e-1".into())),
            error_message: Some("Request timed out".into()),
            type_error: Some("TimeoutError".into()),
            node: Some("zalo".into()),
            created_at: Some("2024-05-01 10:00:00+00".into()),
        };

        let record = wire_to_record(wire).unwrap();
        assert_eq!(record.id, RecordId::Text("e-1".into()));
        assert_eq!(record.message.as_deref(), Some("Request timed out"));
        assert_eq!(record.type_label.as_deref(), Some("TimeoutError"));
        assert_eq!(record.node.as_deref(), Some("zalo"));
    }

    #[test]
    fn test_wire_to_record_drops_unplaceable_rows() {
        let no_id = WireErrorLog {
            created_at: Some("2024-05-01T10:00:00Z".into()),
            ..WireErrorLog::default()
        };
        let bad_time = WireErrorLog {
            id: Some(WireId::Int(1)),
            created_at: Some("not a date".into()),
            ..WireErrorLog::default()
        };
        let no_time = WireErrorLog {
            id: Some(WireId::Int(2)),
            ..WireErrorLog::default()
        };

        assert!(wire_to_record(no_id).is_none());
        assert!(wire_to_record(bad_time).is_none());
        assert!(wire_to_record(no_time).is_none());
    }
}
