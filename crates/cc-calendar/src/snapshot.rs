//! Immutable refresh results and the shapes returned to callers

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{EventDefinition, Occurrence, SourceError};
use crate::recurrence;

/// The aggregated state produced by one refresh.
///
/// Single events are pre-expanded into a sorted index; recurring series are
/// kept as definitions and expanded against each query window.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Occurrences of non-recurring definitions, in chronological order
    pub occurrence_index: Vec<Occurrence>,
    /// Recurring definitions, ordered by first start then uid
    pub recurring: Vec<EventDefinition>,
    /// Sources that failed during the refresh that built this snapshot
    pub source_errors: Vec<SourceError>,
    pub recurring_count: usize,
    /// None until the first refresh is published
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot served before any refresh has completed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from the definitions of every successful source
    pub fn build(
        definitions: Vec<EventDefinition>,
        source_errors: Vec<SourceError>,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let (mut recurring, singles): (Vec<_>, Vec<_>) =
            definitions.into_iter().partition(EventDefinition::is_recurring);

        let mut occurrence_index: Vec<Occurrence> = singles
            .iter()
            .map(|def| Occurrence::from_definition(def, def.dtstart))
            .collect();
        occurrence_index.sort_by(Occurrence::chronological);

        recurring.sort_by(|a, b| {
            a.dtstart
                .cmp(&b.dtstart)
                .then_with(|| a.uid.cmp(&b.uid))
                .then_with(|| a.source.cmp(&b.source))
        });

        Self {
            occurrence_index,
            recurring_count: recurring.len(),
            recurring,
            source_errors,
            refreshed_at: Some(refreshed_at),
        }
    }

    /// Number of definitions held (single plus recurring)
    pub fn definition_count(&self) -> usize {
        self.occurrence_index.len() + self.recurring.len()
    }

    /// All occurrences overlapping `[window_start, window_end)`, sorted.
    ///
    /// Returns the occurrences together with how many of them came from
    /// recurring definitions.
    pub fn occurrences_in(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_candidates: usize,
    ) -> (Vec<Occurrence>, usize) {
        // the index is sorted by start, so nothing past this point can overlap
        let upper = self
            .occurrence_index
            .partition_point(|occ| occ.dtstart < window_end);

        let mut events: Vec<Occurrence> = self.occurrence_index[..upper]
            .iter()
            .filter(|occ| occ.overlaps(window_start, window_end))
            .cloned()
            .collect();

        let mut expanded_count = 0;
        for def in &self.recurring {
            let expanded =
                recurrence::expand_with_limit(def, window_start, window_end, max_candidates);
            expanded_count += expanded.len();
            events.extend(expanded);
        }

        events.sort_by(Occurrence::chronological);
        (events, expanded_count)
    }
}

/// Response of a window query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub events: Vec<Occurrence>,
    pub total_sources: usize,
    pub errors: Vec<SourceError>,
    pub recurring_count: usize,
    /// Occurrences produced by recurring definitions for this window, before truncation
    pub expanded_count: usize,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub limit: usize,
}

/// Outcome of one refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub total_sources: usize,
    pub succeeded: usize,
    pub errors: Vec<SourceError>,
    /// Definitions in the published snapshot
    pub definition_count: usize,
    /// Every source failed and the previous snapshot is still being served
    pub retained_previous: bool,
    pub elapsed_ms: u64,
}

impl RefreshReport {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

/// Summary of the snapshot currently served
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub total_sources: usize,
    pub single_count: usize,
    pub recurring_count: usize,
    pub error_count: usize,
}
