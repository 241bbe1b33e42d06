// Dashboard context: snapshot, filter criteria, and the derived view kept in step
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::{
    aggregator::{aggregate_in, Statistics},
    filter::FilterCriteria,
    models::{ErrorRecord, Snapshot},
    refresh::{LoadState, RefreshConfig, RefreshController, RefreshEvent},
    source::ErrorSource,
};

/// Everything a presentation layer reads
///
/// The active records and statistics are derived from the snapshot and the
/// criteria, and are recomputed whenever either changes, so they never
/// disagree with each other.
pub struct Dashboard {
    controller: RefreshController,
    criteria: FilterCriteria,
    active: Vec<ErrorRecord>,
    stats: Statistics,
    disposed: bool,
}

impl Dashboard {
    pub fn new(source: Arc<dyn ErrorSource>, config: RefreshConfig, criteria: FilterCriteria) -> Self {
        Self {
            controller: RefreshController::new(source, config),
            criteria,
            active: Vec::new(),
            stats: Statistics::default(),
            disposed: false,
        }
    }

    /// Kick off the initial load and the poll timer
    pub fn start(&mut self) {
        if !self.disposed {
            self.controller.start();
        }
    }

    /// Wait for the next refresh event and fold it into the view
    ///
    /// Returns `None` once the dashboard is disposed.
    pub async fn next_event(&mut self) -> Option<RefreshEvent> {
        if self.disposed {
            return None;
        }
        let event = self.controller.next_event().await?;
        self.absorb(&event);
        Some(event)
    }

    /// Wait until the initial load has succeeded or failed
    ///
    /// Poll ticks that arrive while the first fetch is still out are folded
    /// in along the way. Returns `None` if the dashboard is disposed first.
    pub async fn wait_until_loaded(&mut self) -> Option<&LoadState> {
        while *self.state() == LoadState::Loading {
            self.next_event().await?;
        }
        Some(self.state())
    }

    /// Apply every event already waiting. Returns true if the view changed.
    pub fn pump(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let mut changed = false;
        while let Some(event) = self.controller.try_next_event() {
            changed |= self.absorb(&event);
        }
        changed
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query != self.criteria.query {
            self.criteria.query = query;
            self.recompute();
        }
    }

    pub fn set_start(&mut self, start: Option<NaiveDate>) {
        self.criteria.start = start;
        self.recompute();
    }

    pub fn set_end(&mut self, end: Option<NaiveDate>) {
        self.criteria.end = end;
        self.recompute();
    }

    /// Use the calendar day of `instant` as the start bound
    pub fn set_start_instant(&mut self, instant: DateTime<Utc>) {
        self.criteria.start_from_instant(instant);
        self.recompute();
    }

    /// Use the calendar day of `instant` as the end bound
    pub fn set_end_instant(&mut self, instant: DateTime<Utc>) {
        self.criteria.end_from_instant(instant);
        self.recompute();
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.criteria.start = start;
        self.criteria.end = end;
        self.recompute();
    }

    pub fn clear_dates(&mut self) {
        if self.criteria.has_date_range() {
            self.criteria.clear_dates();
            self.recompute();
        }
    }

    /// Returns false when the request was ignored
    pub fn manual_refresh(&mut self) -> bool {
        !self.disposed && self.controller.manual_refresh()
    }

    /// Records passing the current criteria, newest first
    pub fn records(&self) -> &[ErrorRecord] {
        &self.active
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn state(&self) -> &LoadState {
        self.controller.state()
    }

    pub fn is_refreshing(&self) -> bool {
        self.controller.is_refreshing()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.controller.snapshot()
    }

    /// Size of the unfiltered snapshot
    pub fn total_records(&self) -> usize {
        self.controller.snapshot().len()
    }

    /// Whether the criteria hide any record
    pub fn is_filtered(&self) -> bool {
        self.active.len() != self.total_records()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.controller.last_success()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.controller.last_error()
    }

    /// Stop polling and ignore anything still in flight
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.controller.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn absorb(&mut self, event: &RefreshEvent) -> bool {
        if event.replaced_snapshot() {
            self.recompute();
            true
        } else {
            matches!(event, RefreshEvent::LoadFailed { .. })
        }
    }

    fn recompute(&mut self) {
        self.active = self.criteria.apply(self.controller.snapshot().records());
        self.stats = aggregate_in(&self.active, self.criteria.offset);
        debug!(
            "View recomputed: {} of {} records",
            self.active.len(),
            self.total_records()
        );
    }
}
