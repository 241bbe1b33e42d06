// End-to-end flow through the public API with a fake error source
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use errwatch_core::{
    Category, Dashboard, Error, ErrorRecord, ErrorSource, FetchedRecords, FilterCriteria,
    LoadState, RefreshConfig, RefreshEvent, Result, SourceGroup,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves a growing set of records and fails every call listed in `fail_on`
struct FakeStore {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
}

impl FakeStore {
    fn new(fail_on: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn records_for_call(call: usize) -> Vec<ErrorRecord> {
    let mut records = vec![
        ErrorRecord::new(1, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
            .with_type_label("HTTPResponseCodeError:503")
            .with_node("gateway")
            .with_message("Service Unavailable"),
        ErrorRecord::new(2, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
            .with_type_label("N8N")
            .with_message("Workflow failed"),
        ErrorRecord::new(3, Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap())
            .with_type_label("psycopg2.DatabaseError")
            .with_node("billing"),
    ];
    for extra in 0..call {
        records.push(
            ErrorRecord::new(
                100 + extra as i64,
                Utc.with_ymd_and_hms(2024, 5, 3, extra as u32 % 24, 0, 0).unwrap(),
            )
            .with_type_label("TimeoutError"),
        );
    }
    records
}

#[async_trait]
impl ErrorSource for FakeStore {
    async fn fetch_recent(&self, limit: u32) -> Result<FetchedRecords> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        if self.fail_on.contains(&call) {
            return Err(Error::SourceUnavailable(format!("call {} refused", call)));
        }

        let mut records = records_for_call(call);
        records.truncate(limit as usize);
        Ok(FetchedRecords {
            records,
            origin: Some("fake".into()),
        })
    }
}

fn dashboard(store: Arc<FakeStore>) -> Dashboard {
    let config = RefreshConfig {
        poll_interval: Duration::from_secs(30),
        ..RefreshConfig::default()
    };
    Dashboard::new(store, config, FilterCriteria::default())
}

#[tokio::test(start_paused = true)]
async fn test_full_session() {
    let store = FakeStore::new(vec![1]);
    let mut dashboard = dashboard(Arc::clone(&store));
    dashboard.start();

    // Initial load
    assert!(dashboard.next_event().await.unwrap().replaced_snapshot());
    assert_eq!(dashboard.state(), &LoadState::Ready);
    assert_eq!(dashboard.snapshot().origin(), Some("fake"));

    let stats = dashboard.statistics().clone();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unique_node_count, 3);
    assert_eq!(stats.source_count(SourceGroup::Http), 1);
    assert_eq!(stats.source_count(SourceGroup::N8n), 1);
    assert_eq!(stats.source_count(SourceGroup::Other), 1);
    assert_eq!(
        dashboard.records()[0].category().category,
        Category::DatabaseError
    );

    // First poll fails; the view is untouched
    assert!(matches!(
        dashboard.next_event().await,
        Some(RefreshEvent::PollIssued { .. })
    ));
    assert!(matches!(
        dashboard.next_event().await,
        Some(RefreshEvent::FailureSwallowed { .. })
    ));
    assert_eq!(dashboard.statistics(), &stats);
    assert!(dashboard.last_error().is_some());

    // Filter, then let the next poll land under the same criteria
    dashboard.set_query("timeout");
    assert!(dashboard.records().is_empty());
    assert!(dashboard.is_filtered());

    dashboard.next_event().await;
    assert!(dashboard.next_event().await.unwrap().replaced_snapshot());
    assert_eq!(dashboard.total_records(), 5);
    assert_eq!(dashboard.records().len(), 2);
    assert_eq!(dashboard.statistics().total, 2);
    assert_eq!(dashboard.last_error(), None);

    dashboard.dispose();
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_out_of_failed_initial_load() {
    let store = FakeStore::new(vec![0]);
    let mut dashboard = dashboard(store);
    dashboard.start();

    assert!(matches!(
        dashboard.next_event().await,
        Some(RefreshEvent::LoadFailed { .. })
    ));
    assert!(matches!(dashboard.state(), LoadState::Failed { .. }));
    assert!(dashboard.records().is_empty());

    assert!(dashboard.manual_refresh());
    assert!(dashboard.is_refreshing());
    assert!(dashboard.next_event().await.unwrap().replaced_snapshot());
    assert_eq!(dashboard.state(), &LoadState::Ready);
    assert_eq!(dashboard.records().len(), 4);

    // Indicator lingers past the 20ms fetch
    assert!(dashboard.is_refreshing());
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!dashboard.is_refreshing());
}

#[tokio::test(start_paused = true)]
async fn test_date_range_and_pump() {
    let store = FakeStore::new(vec![]);
    let mut dashboard = dashboard(store);
    dashboard.set_date_range(NaiveDate::from_ymd_opt(2024, 5, 2), NaiveDate::from_ymd_opt(2024, 5, 2));
    dashboard.start();

    assert!(!dashboard.pump());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(dashboard.pump());

    assert_eq!(dashboard.records().len(), 1);
    assert_eq!(dashboard.statistics().daily_buckets.len(), 1);
    assert_eq!(dashboard.statistics().daily_buckets[0].day_key, "2024-05-02");

    dashboard.clear_dates();
    assert_eq!(dashboard.records().len(), 3);
}
