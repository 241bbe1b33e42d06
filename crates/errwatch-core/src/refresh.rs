// Lifecycle of the raw snapshot: initial load, polling, manual refresh
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    models::Snapshot,
    source::{ErrorSource, FetchedRecords},
    Result,
};

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Initial fetch in flight, nothing to show yet
    Loading,
    /// At least one fetch succeeded
    Ready,
    /// The initial load failed; only a manual refresh gets out of here
    Failed { reason: String },
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Loading => "Loading",
            LoadState::Ready => "Ready",
            LoadState::Failed { .. } => "Failed",
        }
    }
}

/// Which response wins when fetches overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Whatever resolves last overwrites, even if it was issued earlier
    #[default]
    LastResolved,
    /// Responses older than the one on screen are dropped
    LastIssued,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub poll_interval: Duration,
    /// How long the refreshing indicator lingers after a manual fetch settles
    pub min_indicator: Duration,
    /// How many records to ask the source for
    pub limit: u32,
    pub ordering: ResponseOrdering,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            min_indicator: Duration::from_millis(500),
            limit: 100,
            ordering: ResponseOrdering::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Poll,
    Manual,
}

/// Outcome of handling one controller message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// A poll tick issued a fetch
    PollIssued { seq: u64 },
    /// A poll tick arrived while not `Ready`
    TickSkipped,
    /// The snapshot was replaced wholesale
    Replaced { kind: FetchKind, records: usize },
    /// A fetch failed and left the controller in `Failed`
    LoadFailed { kind: FetchKind, reason: String },
    /// A fetch failed after data was on screen; last-known-good stays
    FailureSwallowed { kind: FetchKind, reason: String },
    /// A response older than the current snapshot was dropped
    StaleDropped { kind: FetchKind, seq: u64 },
}

impl RefreshEvent {
    pub fn replaced_snapshot(&self) -> bool {
        matches!(self, RefreshEvent::Replaced { .. })
    }
}

enum Message {
    Tick,
    Fetched {
        seq: u64,
        kind: FetchKind,
        result: Result<FetchedRecords>,
    },
}

struct ManualRefresh {
    seq: u64,
    settled_at: Option<Instant>,
}

/// Owns the raw snapshot and keeps it current
///
/// Fetches run on spawned tasks and report back over a channel; the owner
/// pulls those reports with [`next_event`](Self::next_event) or
/// [`try_next_event`](Self::try_next_event), so all state changes happen on
/// the owner's task.
pub struct RefreshController {
    source: Arc<dyn ErrorSource>,
    config: RefreshConfig,
    state: LoadState,
    snapshot: Snapshot,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    ticker: Option<JoinHandle<()>>,
    next_seq: u64,
    /// Sequence number of the fetch behind the current snapshot
    shown_seq: u64,
    manual: Option<ManualRefresh>,
    started: bool,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
}

impl RefreshController {
    pub fn new(source: Arc<dyn ErrorSource>, config: RefreshConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            config,
            state: LoadState::Loading,
            snapshot: Snapshot::empty(),
            tx,
            rx,
            ticker: None,
            next_seq: 1,
            shown_seq: 0,
            manual: None,
            started: false,
            last_error: None,
            last_success: None,
        }
    }

    /// Issue the initial fetch and start the poll timer. Must run inside a tokio runtime.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        info!(
            "Starting refresh controller (poll every {:?}, limit {})",
            self.config.poll_interval, self.config.limit
        );

        self.issue_fetch(FetchKind::Initial);

        let tx = self.tx.clone();
        let period = self.config.poll_interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Message::Tick).is_err() {
                    break;
                }
            }
        }));
    }

    /// Tear down the poll timer. In-flight fetches are left alone.
    pub fn dispose(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            info!("Refresh controller disposed");
        }
    }

    /// Operator-triggered fetch
    ///
    /// Returns `false` when ignored: still loading, or a manual refresh is
    /// already showing its indicator.
    pub fn manual_refresh(&mut self) -> bool {
        if !self.started || self.state == LoadState::Loading || self.is_refreshing() {
            return false;
        }

        let seq = self.issue_fetch(FetchKind::Manual);
        self.manual = Some(ManualRefresh {
            seq,
            settled_at: None,
        });
        true
    }

    /// Fetch now as a poll tick would. Ignored unless `Ready`.
    pub fn poll_now(&mut self) -> Option<u64> {
        if self.state != LoadState::Ready {
            return None;
        }
        Some(self.issue_fetch(FetchKind::Poll))
    }

    /// Whether the refreshing indicator should be visible
    ///
    /// On from the trigger until `min_indicator` after the fetch settles, so
    /// it is perceptible however fast the network is.
    pub fn is_refreshing(&self) -> bool {
        match &self.manual {
            None => false,
            Some(ManualRefresh { settled_at: None, .. }) => true,
            Some(ManualRefresh {
                settled_at: Some(at),
                ..
            }) => Instant::now() < *at + self.config.min_indicator,
        }
    }

    /// Wait for the next fetch result or tick and apply it
    pub async fn next_event(&mut self) -> Option<RefreshEvent> {
        let message = self.rx.recv().await?;
        Some(self.handle(message))
    }

    /// Apply one pending message if there is one, without waiting
    pub fn try_next_event(&mut self) -> Option<RefreshEvent> {
        let message = self.rx.try_recv().ok()?;
        Some(self.handle(message))
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Message of the most recent failed fetch, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    fn issue_fetch(&mut self, kind: FetchKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let limit = self.config.limit;
        debug!("Issuing {:?} fetch #{}", kind, seq);

        tokio::spawn(async move {
            let result = source.fetch_recent(limit).await;
            // Receiver gone means the owner is gone; the result is simply dropped
            let _ = tx.send(Message::Fetched { seq, kind, result });
        });

        seq
    }

    fn handle(&mut self, message: Message) -> RefreshEvent {
        match message {
            Message::Tick => match self.poll_now() {
                Some(seq) => RefreshEvent::PollIssued { seq },
                None => {
                    debug!("Skipping poll tick while {}", self.state.label());
                    RefreshEvent::TickSkipped
                }
            },
            Message::Fetched { seq, kind, result } => {
                // Any fetch issued at or after the manual one settles it too
                if let Some(manual) = self.manual.as_mut() {
                    if manual.settled_at.is_none() && seq >= manual.seq {
                        manual.settled_at = Some(Instant::now());
                    }
                }

                match result {
                    Ok(fetched) => self.apply_success(seq, kind, fetched),
                    Err(e) => self.apply_failure(kind, e.to_string()),
                }
            }
        }
    }

    fn apply_success(&mut self, seq: u64, kind: FetchKind, fetched: FetchedRecords) -> RefreshEvent {
        if seq < self.shown_seq {
            match self.config.ordering {
                ResponseOrdering::LastIssued => {
                    debug!("Dropping {:?} response #{} older than #{}", kind, seq, self.shown_seq);
                    return RefreshEvent::StaleDropped { kind, seq };
                }
                ResponseOrdering::LastResolved => {
                    warn!(
                        "{:?} response #{} resolved after #{} and replaces it",
                        kind, seq, self.shown_seq
                    );
                }
            }
        }

        let snapshot = Snapshot::new(fetched.records, Utc::now()).with_origin(fetched.origin);
        let duplicates = snapshot.duplicate_ids();
        if duplicates > 0 {
            warn!("Snapshot contains {} duplicate record ids", duplicates);
        }

        let records = snapshot.len();
        self.snapshot = snapshot;
        self.shown_seq = seq;
        self.last_success = Some(self.snapshot.fetched_at());
        self.last_error = None;

        if self.state != LoadState::Ready {
            info!("Error log loaded: {} records", records);
            self.state = LoadState::Ready;
        } else {
            debug!("{:?} fetch #{} replaced snapshot with {} records", kind, seq, records);
        }

        RefreshEvent::Replaced { kind, records }
    }

    fn apply_failure(&mut self, kind: FetchKind, reason: String) -> RefreshEvent {
        self.last_error = Some(reason.clone());

        match self.state {
            LoadState::Ready => {
                warn!("{:?} fetch failed, keeping last-known-good data: {}", kind, reason);
                RefreshEvent::FailureSwallowed { kind, reason }
            }
            LoadState::Loading | LoadState::Failed { .. } => {
                warn!("{:?} fetch failed, no data to show: {}", kind, reason);
                self.state = LoadState::Failed {
                    reason: reason.clone(),
                };
                RefreshEvent::LoadFailed { kind, reason }
            }
        }
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
