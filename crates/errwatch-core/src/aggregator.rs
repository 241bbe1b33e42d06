// Statistics over the active view
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::classifier::{Category, Integration, UNKNOWN_LABEL};
use crate::models::ErrorRecord;
use crate::time::{day_of, utc_offset};

/// Error count for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// `YYYY-MM-DD`
    pub day_key: String,
    pub count: usize,
}

/// Coarse origin of an error, for the source breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceGroup {
    N8n,
    Http,
    Other,
}

impl SourceGroup {
    pub fn of(category: &Category) -> Self {
        match category {
            Category::Integration(Integration::N8n) => SourceGroup::N8n,
            Category::HttpResponseCode => SourceGroup::Http,
            _ => SourceGroup::Other,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SourceGroup::N8n => "n8n",
            SourceGroup::Http => "HTTP",
            SourceGroup::Other => "Other",
        }
    }
}

/// Error count for one source group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBucket {
    pub source_key: String,
    pub group: SourceGroup,
    pub count: usize,
}

impl SourceBucket {
    /// Share of `total` in percent, 0 when there is nothing to share
    pub fn percent_of(&self, total: usize) -> f64 {
        percent(self.count, total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub unique_node_count: usize,
    /// Distinct raw type labels, not distinct categories
    pub unique_category_count: usize,
    pub daily_buckets: Vec<DailyBucket>,
    pub source_buckets: Vec<SourceBucket>,
}

impl Statistics {
    /// Busiest day, earliest one on ties
    pub fn peak_day(&self) -> Option<&DailyBucket> {
        self.daily_buckets
            .iter()
            .fold(None, |best: Option<&DailyBucket>, bucket| match best {
                Some(b) if b.count >= bucket.count => Some(b),
                _ => Some(bucket),
            })
    }

    pub fn source_count(&self, group: SourceGroup) -> usize {
        self.source_buckets
            .iter()
            .find(|b| b.group == group)
            .map(|b| b.count)
            .unwrap_or(0)
    }
}

/// `part` as a percentage of `whole`, 0 when `whole` is 0
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Aggregate with calendar days taken in UTC
pub fn aggregate(records: &[ErrorRecord]) -> Statistics {
    aggregate_in(records, utc_offset())
}

/// Aggregate with calendar days taken in `offset`
///
/// Everything is recomputed from `records`; nothing carries over between calls.
pub fn aggregate_in(records: &[ErrorRecord], offset: FixedOffset) -> Statistics {
    if records.is_empty() {
        return Statistics::default();
    }

    let unique_node_count = records
        .iter()
        .map(|r| r.node.as_deref())
        .collect::<HashSet<_>>()
        .len();

    let unique_category_count = records
        .iter()
        .map(|r| match r.type_label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => UNKNOWN_LABEL,
        })
        .collect::<HashSet<_>>()
        .len();

    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        *by_day.entry(day_of(record.created_at, offset)).or_insert(0) += 1;
    }
    let daily_buckets = by_day
        .into_iter()
        .map(|(day, count)| DailyBucket {
            day_key: day.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect();

    // At most three groups, so a linear scan keeps first-seen order cheaply
    let mut source_buckets: Vec<SourceBucket> = Vec::with_capacity(3);
    for record in records {
        let group = SourceGroup::of(&record.category().category);
        match source_buckets.iter_mut().find(|b| b.group == group) {
            Some(bucket) => bucket.count += 1,
            None => source_buckets.push(SourceBucket {
                source_key: group.key().to_string(),
                group,
                count: 1,
            }),
        }
    }

    Statistics {
        total: records.len(),
        unique_node_count,
        unique_category_count,
        daily_buckets,
        source_buckets,
    }
}
