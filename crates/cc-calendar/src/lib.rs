//! cc-calendar: Calendar feed aggregation for cc-agenda
//!
//! This crate merges any number of ICS feeds into one queryable view.
//!
//! ## Features
//!
//! - ICS parsing with line unfolding, TZID and RECURRENCE-ID overrides
//! - RRULE expansion (DAILY/WEEKLY/MONTHLY/YEARLY) via the `rrule` crate, bounded by a candidate cap
//! - Concurrent refresh with per-source fault isolation
//! - Reads that never wait for a refresh (the snapshot pointer is swapped atomically)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cc_calendar::EventStore;
//! use cc_core::{CalendarConfig, CalendarSource};
//!
//! let config = CalendarConfig {
//!     sources: vec![CalendarSource::new("work", "https://example.com/work.ics")],
//!     ..CalendarConfig::default()
//! };
//! let store = EventStore::new(&config)?;
//!
//! let report = store.refresh().await;
//! println!("{} of {} sources loaded", report.succeeded, report.total_sources);
//!
//! let result = store.query("2024-01-01", "2024-02-01", 50)?;
//! for event in &result.events {
//!     println!("{} {}", event.dtstart, event.summary);
//! }
//!
//! let standups = store.search_by_keyword("standup", None, None)?;
//! ```

pub mod error;
pub mod fetcher;
pub mod ics;
pub mod models;
pub mod recurrence;
pub mod rule;
pub mod snapshot;
pub mod store;

pub use error::{CalendarError, Result};
pub use fetcher::{CalendarFetcher, HttpFetcher};
pub use models::{CalendarSource, EventDefinition, Occurrence, SourceError};
pub use rule::{Frequency, RecurrenceRule, WeekdayNum};
pub use snapshot::{QueryResult, RefreshReport, Snapshot, StoreStatus};
pub use store::EventStore;
