//! Structured RRULE representation
//!
//! Only the parts the expander understands are kept. Anything else in the
//! rule (BYSETPOS, BYWEEKNO, WKST, ...) is dropped so that a partially
//! understood rule still expands.

use std::fmt;

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::ics;

/// Recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Missing or unrecognized FREQ (HOURLY, SECONDLY, garbage, ...)
    Unsupported,
}

impl Frequency {
    fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            _ => Frequency::Unsupported,
        }
    }

    fn as_str(self) -> Option<&'static str> {
        match self {
            Frequency::Daily => Some("DAILY"),
            Frequency::Weekly => Some("WEEKLY"),
            Frequency::Monthly => Some("MONTHLY"),
            Frequency::Yearly => Some("YEARLY"),
            Frequency::Unsupported => None,
        }
    }
}

/// A BYDAY entry such as `MO`, `2TU` or `-1FR`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Nth occurrence within the month/year; negative counts from the end
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Every `weekday` in the period
    pub fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// The `ordinal`-th `weekday` in the period
    pub fn nth(ordinal: i32, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() < 2 || !value.is_char_boundary(value.len() - 2) {
            return None;
        }
        let (prefix, code) = value.split_at(value.len() - 2);
        let weekday = match code.to_ascii_uppercase().as_str() {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            "SU" => Weekday::Sun,
            _ => return None,
        };

        if prefix.is_empty() {
            return Some(Self::every(weekday));
        }

        let ordinal: i32 = prefix.trim_start_matches('+').parse().ok()?;
        if ordinal == 0 || ordinal.abs() > 53 {
            return None;
        }
        Some(Self::nth(ordinal, weekday))
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self.weekday {
            Weekday::Mon => "MO",
            Weekday::Tue => "TU",
            Weekday::Wed => "WE",
            Weekday::Thu => "TH",
            Weekday::Fri => "FR",
            Weekday::Sat => "SA",
            Weekday::Sun => "SU",
        };
        match self.ordinal {
            Some(ordinal) => write!(f, "{}{}", ordinal, code),
            None => f.write_str(code),
        }
    }
}

/// Parsed RRULE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step between periods, at least 1 when parsed
    pub interval: u32,
    pub count: Option<u32>,
    /// Inclusive upper bound on instance starts
    pub until: Option<DateTime<Utc>>,
    pub by_day: Vec<WeekdayNum>,
    /// Days of month, negative values count from the month end
    pub by_month_day: Vec<i32>,
    pub by_month: Vec<u32>,
}

impl RecurrenceRule {
    /// Create a rule with the given frequency and interval 1
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_by_day(mut self, by_day: Vec<WeekdayNum>) -> Self {
        self.by_day = by_day;
        self
    }

    pub fn with_by_month_day(mut self, by_month_day: Vec<i32>) -> Self {
        self.by_month_day = by_month_day;
        self
    }

    pub fn with_by_month(mut self, by_month: Vec<u32>) -> Self {
        self.by_month = by_month;
        self
    }

    /// Parse an RRULE value (`FREQ=WEEKLY;BYDAY=MO,WE`).
    ///
    /// Never fails: unknown or malformed parts fall back to their defaults.
    /// `tz` resolves floating UNTIL values.
    pub fn parse(value: &str, tz: Option<Tz>) -> Self {
        let mut rule = Self::new(Frequency::Unsupported);

        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            let val = val.trim();

            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => rule.frequency = Frequency::parse(val),
                "INTERVAL" => {
                    rule.interval = val.parse().ok().filter(|i| *i > 0).unwrap_or(1);
                }
                "COUNT" => rule.count = val.parse().ok(),
                "UNTIL" => rule.until = ics::parse_until(val, tz),
                "BYDAY" => {
                    rule.by_day = val.split(',').filter_map(WeekdayNum::parse).collect();
                }
                "BYMONTHDAY" => {
                    rule.by_month_day = val
                        .split(',')
                        .filter_map(|d| d.trim().trim_start_matches('+').parse::<i32>().ok())
                        .filter(|d| *d != 0 && d.abs() <= 31)
                        .collect();
                }
                "BYMONTH" => {
                    rule.by_month = val
                        .split(',')
                        .filter_map(|m| m.trim().parse::<u32>().ok())
                        .filter(|m| (1..=12).contains(m))
                        .collect();
                }
                _ => {}
            }
        }

        rule
    }

    /// Render FREQ, INTERVAL and the BY* parts as an RRULE value.
    ///
    /// COUNT and UNTIL are left out; the expander applies them itself.
    /// Returns `None` for [`Frequency::Unsupported`].
    pub fn pattern(&self) -> Option<String> {
        let mut parts = vec![
            format!("FREQ={}", self.frequency.as_str()?),
            format!("INTERVAL={}", self.interval.max(1)),
        ];
        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", join(&self.by_day)));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join(&self.by_month_day)));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join(&self.by_month)));
        }
        Some(parts.join(";"))
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
