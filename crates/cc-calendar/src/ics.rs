//! ICS (iCalendar) parsing
//!
//! Turns a feed body into [`EventDefinition`]s. Only VEVENT components are
//! read; a malformed event is skipped without affecting its siblings. The
//! whole document is rejected only when it has no calendar structure at all.

use std::collections::HashMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component, Property};
use tracing::{debug, warn};

use crate::error::{CalendarError, Result};
use crate::models::EventDefinition;
use crate::rule::RecurrenceRule;

/// One property of a VEVENT with its name and parameter keys uppercased
#[derive(Debug, Clone)]
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn from_property(property: &Property<'_>) -> Self {
        Self {
            name: property.name.to_string().to_ascii_uppercase(),
            params: property
                .params
                .iter()
                .map(|p| {
                    let value = p.val.as_ref().map(|v| v.to_string()).unwrap_or_default();
                    (p.key.to_string().to_ascii_uppercase(), value.trim_matches('"').to_string())
                })
                .collect(),
            value: property.val.to_string(),
        }
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A date or date-time value resolved to UTC
#[derive(Debug, Clone, Copy, PartialEq)]
struct ParsedTime {
    instant: DateTime<Utc>,
    all_day: bool,
    tz: Option<Tz>,
}

/// A built event plus the bits needed for post-processing
struct ParsedEvent {
    definition: EventDefinition,
    cancelled: bool,
}

/// Parse raw ICS text into event definitions attributed to `source_name`.
///
/// The document is read in one pass when it is well formed. Otherwise each
/// `BEGIN:VEVENT`..`END:VEVENT` block is parsed on its own so that one
/// broken event does not take its siblings down.
pub fn parse(raw: &str, source_name: &str) -> Result<Vec<EventDefinition>> {
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim().is_empty() {
        return Err(CalendarError::ParseError("empty calendar document".to_string()));
    }

    let unfolded = unfold(raw);
    if !unfolded.lines().any(|line| is_marker(line, "BEGIN", "VCALENDAR")) {
        return Err(CalendarError::ParseError(
            "document does not contain a VCALENDAR".to_string(),
        ));
    }

    let expected = unfolded
        .lines()
        .filter(|line| is_marker(line, "BEGIN", "VEVENT"))
        .count();

    let mut skipped = 0usize;
    let mut properties: Vec<Vec<ContentLine>> = match read_calendar(&unfolded) {
        Ok(calendar) => {
            let mut events = Vec::new();
            collect_events(&calendar.components, &mut events);
            events.iter().map(|event| event_properties(event)).collect()
        }
        Err(e) => {
            debug!(source = %source_name, "Calendar did not parse as a whole: {}", e);
            Vec::new()
        }
    };

    if properties.len() != expected {
        debug!(
            source = %source_name,
            expected,
            found = properties.len(),
            "Parsing events one by one"
        );
        properties = event_blocks(&unfolded, &mut skipped)
            .iter()
            .filter_map(|block| match read_calendar(block) {
                Ok(calendar) => {
                    let mut events = Vec::new();
                    collect_events(&calendar.components, &mut events);
                    let event = events.first().map(|event| event_properties(event));
                    if event.is_none() {
                        skipped += 1;
                    }
                    event
                }
                Err(e) => {
                    debug!(source = %source_name, "Skipping unparsable event: {}", e);
                    skipped += 1;
                    None
                }
            })
            .collect();
    }

    let mut parsed = Vec::new();
    for lines in &properties {
        match build_event(lines, source_name) {
            Ok(event) => parsed.push(event),
            Err(reason) => {
                debug!(source = %source_name, "Skipping event: {}", reason);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(source = %source_name, skipped, "Skipped malformed events");
    }

    Ok(apply_overrides(parsed))
}

/// `BEGIN:<component>` / `END:<component>` check, ignoring case
fn is_marker(line: &str, keyword: &str, component: &str) -> bool {
    line.trim()
        .split_once(':')
        .is_some_and(|(k, c)| k.eq_ignore_ascii_case(keyword) && c.trim().eq_ignore_ascii_case(component))
}

/// VEVENTs at the top level or directly inside a VCALENDAR
fn collect_events<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        let name = component.name.to_string();
        if name.eq_ignore_ascii_case("VEVENT") {
            out.push(component);
        } else if name.eq_ignore_ascii_case("VCALENDAR") {
            collect_events(&component.components, out);
        }
    }
}

/// Own properties of a VEVENT; sub-components such as VALARM are ignored
fn event_properties(event: &Component<'_>) -> Vec<ContentLine> {
    event.properties.iter().map(ContentLine::from_property).collect()
}

/// Split unfolded text into standalone VEVENT blocks.
///
/// A block interrupted by another `BEGIN:VEVENT`, or never closed, is
/// dropped and counted in `skipped`.
fn event_blocks(unfolded: &str, skipped: &mut usize) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    // sub-components (VALARM, ...) open inside the current VEVENT
    let mut nested = 0usize;

    for line in unfolded.lines().filter(|line| !line.trim().is_empty()) {
        if is_marker(line, "BEGIN", "VEVENT") {
            if current.is_some() {
                *skipped += 1;
            }
            current = Some(vec![line]);
            nested = 0;
            continue;
        }

        let Some(lines) = current.as_mut() else {
            continue;
        };
        lines.push(line);

        if is_marker(line, "END", "VEVENT") && nested == 0 {
            if let Some(lines) = current.take() {
                let mut block = lines.join("\r\n");
                block.push_str("\r\n");
                blocks.push(block);
            }
        } else if line.trim().split_once(':').is_some_and(|(k, _)| k.eq_ignore_ascii_case("BEGIN")) {
            nested += 1;
        } else if line.trim().split_once(':').is_some_and(|(k, _)| k.eq_ignore_ascii_case("END")) {
            nested = nested.saturating_sub(1);
        }
    }

    if current.is_some() {
        *skipped += 1;
    }

    blocks
}

/// Fold RECURRENCE-ID overrides into their masters and drop cancelled events.
fn apply_overrides(parsed: Vec<ParsedEvent>) -> Vec<EventDefinition> {
    let mut overridden: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
    for event in &parsed {
        if let Some(recurrence_id) = event.definition.recurrence_id {
            overridden
                .entry(event.definition.uid.clone())
                .or_default()
                .push(recurrence_id);
        }
    }

    parsed
        .into_iter()
        .filter(|event| !event.cancelled)
        .map(|event| {
            let mut def = event.definition;
            if def.is_recurring() && def.recurrence_id.is_none() {
                if let Some(instants) = overridden.get(&def.uid) {
                    def.exception_dates.extend(instants.iter().copied());
                }
            }
            def
        })
        .collect()
}

/// Build one event from the properties of a VEVENT block
fn build_event(lines: &[ContentLine], source_name: &str) -> std::result::Result<ParsedEvent, String> {
    let find = |name: &str| lines.iter().find(|l| l.name == name);

    let uid = find("UID")
        .map(|l| l.value.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| "missing UID".to_string())?;

    let start_line = find("DTSTART").ok_or_else(|| format!("event {} has no DTSTART", uid))?;
    let start = parse_time(&start_line.value, start_line)
        .ok_or_else(|| format!("event {} has an invalid DTSTART '{}'", uid, start_line.value))?;

    let dtend = match find("DTEND").and_then(|l| parse_time(&l.value, l)) {
        Some(end) => Some(end.instant),
        None => match find("DURATION") {
            Some(line) => {
                let duration = parse_duration(&line.value)
                    .ok_or_else(|| format!("event {} has an invalid DURATION '{}'", uid, line.value))?;
                let end = start
                    .instant
                    .checked_add_signed(duration)
                    .ok_or_else(|| format!("event {} ends out of range", uid))?;
                Some(end)
            }
            None if start.all_day => Some(start.instant),
            None => None,
        },
    };

    let recurrence_rule = find("RRULE").map(|l| RecurrenceRule::parse(&l.value, start.tz));

    let exception_dates = lines
        .iter()
        .filter(|l| l.name == "EXDATE")
        .flat_map(|l| {
            l.value
                .split(',')
                .filter_map(|v| parse_time(v.trim(), l))
                .map(|t| t.instant)
                .collect::<Vec<_>>()
        })
        .collect();

    let recurrence_id = find("RECURRENCE-ID")
        .and_then(|l| parse_time(&l.value, l))
        .map(|t| t.instant);

    let cancelled = find("STATUS")
        .map(|l| l.value.trim().eq_ignore_ascii_case("CANCELLED"))
        .unwrap_or(false);

    let text = |name: &str| find(name).map(|l| unescape_text(&l.value));

    let definition = EventDefinition {
        uid,
        summary: text("SUMMARY").unwrap_or_default(),
        description: text("DESCRIPTION"),
        location: text("LOCATION"),
        dtstart: start.instant,
        dtend,
        all_day: start.all_day,
        tzid: start.tz,
        // an override instance stands alone even if it repeats the master's RRULE
        recurrence_rule: if recurrence_id.is_some() { None } else { recurrence_rule },
        exception_dates,
        recurrence_id,
        source: source_name.to_string(),
    };

    Ok(ParsedEvent {
        definition,
        cancelled,
    })
}

/// Parse a DATE or DATE-TIME value honoring VALUE=DATE and TZID parameters
fn parse_time(value: &str, line: &ContentLine) -> Option<ParsedTime> {
    let value = value.trim();
    let is_date = line
        .param("VALUE")
        .map(|v| v.eq_ignore_ascii_case("DATE"))
        .unwrap_or(false)
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some(ParsedTime {
            instant: date.and_time(NaiveTime::MIN).and_utc(),
            all_day: true,
            tz: None,
        });
    }

    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        let naive = parse_naive_date_time(utc)?;
        return Some(ParsedTime {
            instant: naive.and_utc(),
            all_day: false,
            tz: None,
        });
    }

    let naive = parse_naive_date_time(value)?;
    let tz = line.param("TZID").and_then(resolve_tz);
    let instant = match tz {
        Some(tz) => local_to_utc(&tz, naive)?,
        None => naive.and_utc(),
    };

    Some(ParsedTime {
        instant,
        all_day: false,
        tz,
    })
}

fn parse_naive_date_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M"))
        .ok()
}

/// Resolve a TZID, tolerating vendor prefixes like `/mozilla.org/20050126_1/Europe/Berlin`
fn resolve_tz(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim();
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }

    let segments: Vec<&str> = tzid.split('/').filter(|s| !s.is_empty()).collect();
    for take in [3, 2] {
        if segments.len() >= take {
            let candidate = segments[segments.len() - take..].join("/");
            if let Ok(tz) = candidate.parse::<Tz>() {
                return Some(tz);
            }
        }
    }

    debug!("Unknown TZID '{}', treating as UTC", tzid);
    None
}

/// Convert a wall-clock time in `tz` to UTC; DST gaps shift forward by one hour
fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&naive.checked_add_signed(Duration::hours(1))?)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Parse an RRULE UNTIL value. A date-only UNTIL covers the whole day.
pub(crate) fn parse_until(value: &str, tz: Option<Tz>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc());
    }
    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        return parse_naive_date_time(utc).map(|dt| dt.and_utc());
    }
    let naive = parse_naive_date_time(value)?;
    match tz {
        Some(tz) => local_to_utc(&tz, naive),
        None => Some(naive.and_utc()),
    }
}

/// Parse an RFC 5545 DURATION such as `PT1H30M`, `P1D` or `-P1W`.
///
/// Values outside the representable range yield `None`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let rest = rest.strip_prefix(['P', 'p'])?;

    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_unit = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' => in_time = true,
            d if d.is_ascii_digit() => number.push(d),
            unit => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let part = match (unit, in_time) {
                    ('W', false) => Duration::try_weeks(n),
                    ('D', false) => Duration::try_days(n),
                    ('H', true) => Duration::try_hours(n),
                    ('M', true) => Duration::try_minutes(n),
                    ('S', true) => Duration::try_seconds(n),
                    _ => None,
                }?;
                total = total.checked_add(&part)?;
                seen_unit = true;
            }
        }
    }

    if !number.is_empty() || !seen_unit {
        return None;
    }
    Some(if negative { -total } else { total })
}

/// Undo TEXT escaping (`\n`, `\,`, `\;`, `\\`)
fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Frequency;
    use chrono::TimeZone;

    fn calendar(body: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{}END:VCALENDAR\r\n",
            body
        )
    }

    #[test]
    fn test_parse_single_event() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:evt-1\r\nSUMMARY:Team sync\r\nLOCATION:Room 4\\, floor 2\r\n\
             DTSTART:20240105T090000Z\r\nDTEND:20240105T100000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.uid, "evt-1");
        assert_eq!(event.summary, "Team sync");
        assert_eq!(event.location.as_deref(), Some("Room 4, floor 2"));
        assert_eq!(event.source, "work");
        assert!(!event.all_day);
        assert_eq!(event.dtstart, Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap());
        assert_eq!(event.dtend, Some(Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()));
        assert!(event.recurrence_rule.is_none());
    }

    #[test]
    fn test_missing_uid_skips_only_that_event() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nSUMMARY:No uid\r\nDTSTART:20240105T090000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:ok\r\nSUMMARY:Fine\r\nDTSTART:20240106T090000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:bad-start\r\nDTSTART:not-a-date\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "ok");
    }

    #[test]
    fn test_all_day_without_dtend() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:holiday\r\nSUMMARY:Holiday\r\nDTSTART;VALUE=DATE:20240101\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "home").unwrap();
        let event = &events[0];
        assert!(event.all_day);
        assert_eq!(event.dtstart, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(event.dtend, Some(event.dtstart));
    }

    #[test]
    fn test_duration_used_when_dtend_missing() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:d\r\nDTSTART:20240105T090000Z\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(
            events[0].dtend,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_folded_lines_and_unknown_components() {
        let ics = calendar(
            "BEGIN:VTODO\r\nUID:todo\r\nSUMMARY:Ignore me\r\nEND:VTODO\r\n\
             BEGIN:VEVENT\r\nUID:fold\r\nSUMMARY:A very long\r\n  summary\r\n\
             DTSTART:20240105T090000Z\r\n\
             BEGIN:VALARM\r\nDESCRIPTION:Reminder text\r\nTRIGGER:-PT15M\r\nEND:VALARM\r\n\
             END:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "A very long summary");
        assert!(events[0].description.is_none());
    }

    #[test]
    fn test_rrule_and_exdates() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:weekly\r\nSUMMARY:Weekly\r\nDTSTART:20240101T090000Z\r\n\
             RRULE:FREQ=WEEKLY;COUNT=5;BYSETPOS=1\r\n\
             EXDATE:20240108T090000Z,20240115T090000Z\r\nEXDATE:20240122T090000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        let rule = events[0].recurrence_rule.as_ref().unwrap();
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.count, Some(5));
        assert_eq!(events[0].exception_dates.len(), 3);
    }

    #[test]
    fn test_tzid_converted_to_utc() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:tz\r\nDTSTART;TZID=Europe/Berlin:20240701T090000\r\n\
             DTEND;TZID=\"Europe/Berlin\":20240701T100000\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        // CEST is UTC+2
        assert_eq!(events[0].dtstart, Utc.with_ymd_and_hms(2024, 7, 1, 7, 0, 0).unwrap());
        assert_eq!(events[0].tzid, Some(chrono_tz::Europe::Berlin));
    }

    #[test]
    fn test_vendor_prefixed_tzid() {
        assert_eq!(
            resolve_tz("/mozilla.org/20050126_1/America/New_York"),
            Some(chrono_tz::America::New_York)
        );
        assert_eq!(resolve_tz("Not/AZone"), None);
    }

    #[test]
    fn test_recurrence_id_override_excludes_master_instance() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:series\r\nSUMMARY:Standup\r\nDTSTART:20240101T090000Z\r\n\
             RRULE:FREQ=DAILY;COUNT=5\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:series\r\nSUMMARY:Standup (moved)\r\n\
             RECURRENCE-ID:20240103T090000Z\r\nDTSTART:20240103T140000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:series\r\nRECURRENCE-ID:20240104T090000Z\r\n\
             DTSTART:20240104T090000Z\r\nSTATUS:CANCELLED\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(events.len(), 2);

        let master = events.iter().find(|e| e.is_recurring()).unwrap();
        assert!(master
            .exception_dates
            .contains(&Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()));
        assert!(master
            .exception_dates
            .contains(&Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap()));

        let moved = events.iter().find(|e| !e.is_recurring()).unwrap();
        assert_eq!(moved.summary, "Standup (moved)");
    }

    #[test]
    fn test_rejects_non_calendar_input() {
        assert!(parse("", "work").is_err());
        assert!(parse("   \r\n", "work").is_err());
        assert!(parse("<html><body>Not found</body></html>", "work").is_err());
    }

    #[test]
    fn test_empty_calendar_is_ok() {
        let events = parse(&calendar(""), "work").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_unterminated_event_skipped() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\nDTSTART:20240101T090000Z\r\n\
                   BEGIN:VEVENT\r\nUID:b\r\nDTSTART:20240102T090000Z\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:c\r\nDTSTART:20240103T090000Z\r\n";

        let events = parse(ics, "work").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "b");
    }

    #[test]
    fn test_malformed_line_isolated_to_its_event() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:good\r\nDTSTART:20240105T090000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:broken\r\nthis line has no value separator\r\n\
             DTSTART:20240106T090000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:also-good\r\nDTSTART:20240107T090000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        let uids: Vec<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        assert!(uids.contains(&"good"));
        assert!(uids.contains(&"also-good"));
    }

    #[test]
    fn test_out_of_range_duration_skips_event() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:huge\r\nDTSTART:20240105T090000Z\r\nDURATION:P99999999999999W\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:far\r\nDTSTART:20240105T090000Z\r\nDURATION:P9999999999D\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:ok\r\nDTSTART:20240105T090000Z\r\nDURATION:PT30M\r\nEND:VEVENT\r\n",
        );

        let events = parse(&ics, "work").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "ok");
    }

    #[test]
    fn test_parse_duration_values() {
        assert_eq!(parse_duration("PT1H"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("P1DT2H"), Some(Duration::hours(26)));
        assert_eq!(parse_duration("P2W"), Some(Duration::weeks(2)));
        assert_eq!(parse_duration("-PT15M"), Some(Duration::minutes(-15)));
        assert_eq!(parse_duration("P"), None);
        assert_eq!(parse_duration("PT5X"), None);
        assert_eq!(parse_duration("P99999999999999W"), None);
        assert_eq!(parse_duration("PT9223372036854775807S"), None);
        assert_eq!(parse_duration("P99999999999999999999D"), None);
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text("a\\nb\\, c\\; d\\\\"), "a\nb, c; d\\");
    }
}
