//! RRULE expansion for recurring events.
//!
//! Expands one [`EventDefinition`] into the concrete [`Occurrence`]s that
//! intersect a half-open window. The rule is handed to the `rrule` crate and
//! its instances are walked in order from DTSTART, so interval phase stays
//! correct; instances before the window are generated and then discarded.
//! Every expansion is bounded by a hard cap on generated candidates.

use chrono::{DateTime, Utc};
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::models::{EventDefinition, Occurrence};
use crate::rule::RecurrenceRule;

/// Default cap on generated candidates
pub const DEFAULT_MAX_CANDIDATES: usize = 100_000;

/// Expand `def` over `[window_start, window_end)` with the default cap.
pub fn expand(
    def: &EventDefinition,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    expand_with_limit(def, window_start, window_end, DEFAULT_MAX_CANDIDATES)
}

/// Expand `def` over `[window_start, window_end)`.
///
/// Non-recurring definitions yield at most one occurrence. Recurring ones
/// yield every rule instance that overlaps the window, minus exception
/// dates, in ascending start order. When `max_candidates` is reached the
/// occurrences produced so far are returned.
pub fn expand_with_limit(
    def: &EventDefinition,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    max_candidates: usize,
) -> Vec<Occurrence> {
    if window_end <= window_start {
        return Vec::new();
    }

    let Some(rule) = def.recurrence_rule.as_ref() else {
        return first_instance(def, window_start, window_end);
    };

    if rule.count == Some(0) || rule.until.is_some_and(|until| until < def.dtstart) {
        return Vec::new();
    }

    let rule_set = match build_rule_set(def, rule) {
        Ok(rule_set) => rule_set,
        Err(reason) => {
            debug!(
                uid = %def.uid,
                source = %def.source,
                "Recurrence rule not expandable ({}), keeping the first instance",
                reason
            );
            return first_instance(def, window_start, window_end);
        }
    };

    let count = rule
        .count
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(usize::MAX);

    let mut occurrences = Vec::new();
    let mut generated = 0usize;
    let mut capped = false;

    for instance in &rule_set {
        if generated >= count {
            break;
        }
        if generated >= max_candidates {
            capped = true;
            break;
        }
        generated += 1;

        let start = instance.with_timezone(&Utc);
        if start >= window_end || rule.until.is_some_and(|until| start > until) {
            break;
        }
        if def.exception_dates.contains(&start) {
            continue;
        }
        let occurrence = Occurrence::from_definition(def, start);
        if occurrence.overlaps(window_start, window_end) {
            occurrences.push(occurrence);
        }
    }

    if capped {
        warn!(
            uid = %def.uid,
            source = %def.source,
            max_candidates,
            "Recurrence expansion reached the candidate cap"
        );
    }

    occurrences
}

/// DTSTART alone, for single events and rules that cannot be expanded
fn first_instance(
    def: &EventDefinition,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    if def.is_recurring() && def.exception_dates.contains(&def.dtstart) {
        return Vec::new();
    }
    let occurrence = Occurrence::from_definition(def, def.dtstart);
    if occurrence.overlaps(window_start, window_end) {
        vec![occurrence]
    } else {
        Vec::new()
    }
}

/// Build the `rrule` set for `def`.
///
/// Zoned timed series are anchored on their wall-clock DTSTART so that the
/// local time survives DST changes. All-day and UTC series use UTC.
fn build_rule_set(def: &EventDefinition, rule: &RecurrenceRule) -> Result<RRuleSet, String> {
    let pattern = rule
        .pattern()
        .ok_or_else(|| "unsupported frequency".to_string())?;

    let dtstart = match def.tzid.filter(|_| !def.all_day) {
        Some(tz) => format!(
            "DTSTART;TZID={}:{}",
            tz.name(),
            def.dtstart.with_timezone(&tz).format("%Y%m%dT%H%M%S")
        ),
        None => format!("DTSTART:{}", def.dtstart.format("%Y%m%dT%H%M%SZ")),
    };

    format!("{}\nRRULE:{}", dtstart, pattern)
        .parse::<RRuleSet>()
        .map_err(|e| e.to_string())
}
