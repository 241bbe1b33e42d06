// Text and date-range filtering of the raw snapshot
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::models::ErrorRecord;
use crate::time::{day_of, end_of_day, start_of_day, utc_offset};

/// Everything that decides which records make it into the active view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    /// First day to include, from 00:00:00
    pub start: Option<NaiveDate>,
    /// Last day to include, up to 23:59:59
    pub end: Option<NaiveDate>,
    /// Offset in which calendar days are taken
    pub offset: FixedOffset,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: String::new(),
            start: None,
            end: None,
            offset: utc_offset(),
        }
    }
}

impl FilterCriteria {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Use the calendar day of `instant` as the start bound; the time of day is dropped
    pub fn start_from_instant(&mut self, instant: DateTime<Utc>) {
        self.start = Some(day_of(instant, self.offset));
    }

    /// Use the calendar day of `instant` as the end bound; the time of day is dropped
    pub fn end_from_instant(&mut self, instant: DateTime<Utc>) {
        self.end = Some(day_of(instant, self.offset));
    }

    pub fn clear_dates(&mut self) {
        self.start = None;
        self.end = None;
    }

    pub fn has_date_range(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.has_date_range()
    }

    /// Records passing both predicates, input order preserved
    pub fn apply(&self, records: &[ErrorRecord]) -> Vec<ErrorRecord> {
        let predicate = self.compile();
        records
            .iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect()
    }

    pub fn matches(&self, record: &ErrorRecord) -> bool {
        self.compile().matches(record)
    }

    /// Human description of the date range, `None` when unbounded
    pub fn describe_dates(&self, date_format: &str) -> Option<String> {
        let fmt = |d: NaiveDate| d.format(date_format).to_string();
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(format!("{} – {}", fmt(start), fmt(end))),
            (Some(start), None) => Some(format!("from {} onwards", fmt(start))),
            (None, Some(end)) => Some(format!("until {}", fmt(end))),
            (None, None) => None,
        }
    }

    fn compile(&self) -> Predicate {
        Predicate {
            needle: self.query.to_lowercase(),
            from: self.start.map(|d| start_of_day(d, self.offset)),
            until: self.end.map(|d| end_of_day(d, self.offset)),
        }
    }
}

/// Criteria lowered once per filtering pass
struct Predicate {
    needle: String,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl Predicate {
    fn matches(&self, record: &ErrorRecord) -> bool {
        self.matches_text(record) && self.matches_dates(record)
    }

    fn matches_text(&self, record: &ErrorRecord) -> bool {
        if self.needle.is_empty() {
            return true;
        }

        [&record.type_label, &record.node, &record.message]
            .into_iter()
            .any(|field| {
                field
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&self.needle)
            })
    }

    fn matches_dates(&self, record: &ErrorRecord) -> bool {
        self.from.map_or(true, |from| record.created_at >= from)
            && self.until.map_or(true, |until| record.created_at <= until)
    }
}

/// Filter with calendar days taken in UTC
pub fn apply_filters(
    records: &[ErrorRecord],
    query: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<ErrorRecord> {
    FilterCriteria::default()
        .with_query(query)
        .with_range(start, end)
        .apply(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::offset_from_minutes;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, h, m, s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn sample() -> Vec<ErrorRecord> {
        vec![
            ErrorRecord::new(1, at(5, 12, 0, 0))
                .with_type_label("HTTPResponseCodeError:502")
                .with_node("gateway")
                .with_message("Bad Gateway from upstream"),
            ErrorRecord::new(2, at(4, 9, 30, 0))
                .with_type_label("n8n")
                .with_message("Workflow 'Sync Leads' failed"),
            ErrorRecord::new(3, at(3, 23, 59, 59)).with_node("telegram-bot"),
            ErrorRecord::new(4, at(3, 0, 0, 0)).with_type_label("ValueError"),
            ErrorRecord::new(5, at(1, 8, 0, 0)),
        ]
    }

    fn ids(records: &[ErrorRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_no_filters_is_identity() {
        let records = sample();
        assert_eq!(apply_filters(&records, "", None, None), records);
    }

    #[test]
    fn test_query_matches_any_field_case_insensitively() {
        let records = sample();
        assert_eq!(ids(&apply_filters(&records, "GATEWAY", None, None)), vec!["1"]);
        assert_eq!(ids(&apply_filters(&records, "sync leads", None, None)), vec!["2"]);
        assert_eq!(ids(&apply_filters(&records, "Telegram", None, None)), vec!["3"]);
        assert_eq!(ids(&apply_filters(&records, "error", None, None)), vec!["1", "4"]);
        assert!(apply_filters(&records, "nothing matches this", None, None).is_empty());
    }

    #[test]
    fn test_absent_fields_never_drop_records_from_empty_query() {
        let records = vec![ErrorRecord::new(9, at(1, 0, 0, 0))];
        assert_eq!(apply_filters(&records, "", None, None).len(), 1);
        assert!(apply_filters(&records, "n/a", None, None).is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive_at_both_ends() {
        let records = sample();
        let filtered = apply_filters(&records, "", Some(day(3)), Some(day(3)));
        // 00:00:00 and 23:59:59 on the 3rd are both in
        assert_eq!(ids(&filtered), vec!["3", "4"]);
    }

    #[test]
    fn test_end_bound_stops_at_235959() {
        let records = vec![
            ErrorRecord::new(1, at(3, 23, 59, 59) + Duration::milliseconds(500)),
            ErrorRecord::new(2, at(4, 0, 0, 0)),
        ];
        assert!(apply_filters(&records, "", None, Some(day(3))).is_empty());
    }

    #[test]
    fn test_open_ended_ranges() {
        let records = sample();
        assert_eq!(ids(&apply_filters(&records, "", Some(day(4)), None)), vec!["1", "2"]);
        assert_eq!(ids(&apply_filters(&records, "", None, Some(day(1)))), vec!["5"]);
    }

    #[test]
    fn test_inverted_range_is_empty_not_an_error() {
        let records = sample();
        assert!(apply_filters(&records, "", Some(day(5)), Some(day(1))).is_empty());
    }

    #[test]
    fn test_time_of_day_is_dropped_from_bounds() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.start_from_instant(at(3, 18, 45, 0));
        criteria.end_from_instant(at(3, 6, 0, 0));
        assert_eq!(ids(&criteria.apply(&records)), vec!["3", "4"]);
    }

    #[test]
    fn test_text_and_dates_combine() {
        let records = sample();
        let filtered = apply_filters(&records, "error", Some(day(4)), None);
        assert_eq!(ids(&filtered), vec!["1"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let records = sample();
        let cases = [
            ("", None, None),
            ("error", None, None),
            ("", Some(day(3)), Some(day(4))),
            ("n8n", Some(day(1)), Some(day(5))),
        ];
        for (query, start, end) in cases {
            let once = apply_filters(&records, query, start, end);
            let twice = apply_filters(&once, query, start, end);
            assert_eq!(once, twice, "query {:?}", query);
        }
    }

    #[test]
    fn test_offset_shifts_day_boundaries() {
        // 2024-05-03T23:59:59Z is already the 4th at UTC+7
        let records = sample();
        let criteria = FilterCriteria::new(offset_from_minutes(7 * 60))
            .with_range(Some(day(4)), Some(day(4)));
        assert_eq!(ids(&criteria.apply(&records)), vec!["2", "3"]);
    }

    #[test]
    fn test_describe_dates() {
        let mut criteria = FilterCriteria::default();
        assert_eq!(criteria.describe_dates("%d/%m/%Y"), None);
        assert!(!criteria.is_active());

        criteria.start = Some(day(1));
        assert_eq!(
            criteria.describe_dates("%d/%m/%Y").as_deref(),
            Some("from 01/05/2024 onwards")
        );

        criteria.end = Some(day(3));
        assert_eq!(
            criteria.describe_dates("%d/%m/%Y").as_deref(),
            Some("01/05/2024 – 03/05/2024")
        );

        criteria.start = None;
        assert_eq!(criteria.describe_dates("%Y-%m-%d").as_deref(), Some("until 2024-05-03"));
        assert!(criteria.is_active());

        criteria.clear_dates();
        assert!(!criteria.has_date_range());
    }
}
