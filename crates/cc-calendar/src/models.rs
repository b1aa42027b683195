//! Data models for calendar aggregation

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::rule::RecurrenceRule;

pub use cc_core::CalendarSource;

/// A parsed VEVENT, either a single event or a recurring series
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    /// Event unique identifier
    pub uid: String,
    /// Event summary/title
    pub summary: String,
    /// Event description
    pub description: Option<String>,
    /// Event location
    pub location: Option<String>,
    /// Start of the first instance
    pub dtstart: DateTime<Utc>,
    /// End of the first instance
    pub dtend: Option<DateTime<Utc>>,
    /// All-day event flag
    pub all_day: bool,
    /// Zone DTSTART was expressed in, used to keep recurring wall-clock times stable
    pub tzid: Option<Tz>,
    /// Parsed RRULE
    pub recurrence_rule: Option<RecurrenceRule>,
    /// Excluded instance starts (EXDATE and overridden RECURRENCE-IDs)
    pub exception_dates: BTreeSet<DateTime<Utc>>,
    /// Set when this event overrides one instance of a recurring series
    pub recurrence_id: Option<DateTime<Utc>>,
    /// Name of the source feed
    pub source: String,
}

impl EventDefinition {
    /// Create a single, timed event definition without an end
    pub fn new(
        uid: impl Into<String>,
        summary: impl Into<String>,
        dtstart: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            summary: summary.into(),
            description: None,
            location: None,
            dtstart,
            dtend: None,
            all_day: false,
            tzid: None,
            recurrence_rule: None,
            exception_dates: BTreeSet::new(),
            recurrence_id: None,
            source: source.into(),
        }
    }

    /// Set the end time
    pub fn with_end(mut self, dtend: DateTime<Utc>) -> Self {
        self.dtend = Some(dtend);
        self
    }

    /// Set the recurrence rule
    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }

    /// Add an excluded instance start
    pub fn with_exception(mut self, instant: DateTime<Utc>) -> Self {
        self.exception_dates.insert(instant);
        self
    }

    /// Mark as an all-day event
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Whether the definition carries a recurrence rule
    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_some()
    }

    /// End of the first instance, falling back to its start
    pub fn end(&self) -> DateTime<Utc> {
        self.dtend.unwrap_or(self.dtstart)
    }

    /// Duration of one instance (never negative)
    pub fn duration(&self) -> Duration {
        let duration = self.end() - self.dtstart;
        if duration < Duration::zero() {
            Duration::zero()
        } else {
            duration
        }
    }
}

/// One concrete instance of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub uid: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub dtstart: DateTime<Utc>,
    pub dtend: DateTime<Utc>,
    pub all_day: bool,
    /// Produced by a recurring definition
    #[serde(default)]
    pub recurring: bool,
    pub source: String,
}

impl Occurrence {
    /// Build an occurrence of `def` starting at `dtstart`, preserving its duration
    pub fn from_definition(def: &EventDefinition, dtstart: DateTime<Utc>) -> Self {
        Self {
            uid: def.uid.clone(),
            summary: def.summary.clone(),
            description: def.description.clone(),
            location: def.location.clone(),
            dtstart,
            dtend: dtstart
                .checked_add_signed(def.duration())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            all_day: def.all_day,
            recurring: def.is_recurring(),
            source: def.source.clone(),
        }
    }

    /// Whether `[dtstart, dtend)` intersects `[window_start, window_end)`.
    ///
    /// Zero-length occurrences are treated as instants inside the window.
    pub fn overlaps(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        overlaps(self.dtstart, self.dtend, window_start, window_end)
    }

    /// Case-insensitive substring match on the summary
    pub fn matches_keyword(&self, keyword_lower: &str) -> bool {
        self.summary.to_lowercase().contains(keyword_lower)
    }

    /// Result ordering: start, then uid, then source and end for a total order
    pub fn chronological(a: &Occurrence, b: &Occurrence) -> Ordering {
        a.dtstart
            .cmp(&b.dtstart)
            .then_with(|| a.uid.cmp(&b.uid))
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.dtend.cmp(&b.dtend))
    }
}

/// Half-open interval intersection with instant semantics for empty spans
pub(crate) fn overlaps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    if start >= window_end {
        return false;
    }
    if end <= start {
        return start >= window_start;
    }
    end > window_start
}

/// A source that failed to fetch or parse during a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

impl SourceError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_overlap_half_open() {
        // [10:00, 11:00) vs [11:00, 12:00)
        assert!(!overlaps(at(1, 10), at(1, 11), at(1, 11), at(1, 12)));
        assert!(overlaps(at(1, 10), at(1, 12), at(1, 11), at(1, 13)));
        assert!(!overlaps(at(1, 12), at(1, 13), at(1, 10), at(1, 12)));
    }

    #[test]
    fn test_overlap_zero_length() {
        assert!(overlaps(at(1, 10), at(1, 10), at(1, 10), at(1, 11)));
        assert!(!overlaps(at(1, 11), at(1, 11), at(1, 10), at(1, 11)));
        assert!(!overlaps(at(1, 9), at(1, 9), at(1, 10), at(1, 11)));
    }

    #[test]
    fn test_duration_never_negative() {
        let def = EventDefinition::new("a", "Broken", at(2, 10), "work").with_end(at(1, 10));
        assert_eq!(def.duration(), Duration::zero());
    }

    #[test]
    fn test_chronological_tie_break() {
        let def_a = EventDefinition::new("a", "A", at(1, 9), "work");
        let def_b = EventDefinition::new("b", "B", at(1, 9), "work");
        let mut items = vec![
            Occurrence::from_definition(&def_b, at(1, 9)),
            Occurrence::from_definition(&def_a, at(1, 9)),
        ];
        items.sort_by(Occurrence::chronological);
        assert_eq!(items[0].uid, "a");
    }

    #[test]
    fn test_occurrence_serializes_camel_case() {
        let def = EventDefinition::new("a", "Standup", at(1, 9), "work").with_all_day(true);
        let json = serde_json::to_value(Occurrence::from_definition(&def, at(1, 9))).unwrap();
        assert_eq!(json["allDay"], true);
        assert!(json.get("description").is_none());
    }
}
