//! Event store
//!
//! Fetches every configured source concurrently, builds a [`Snapshot`] and
//! publishes it with a single pointer swap. Readers take the read lock only
//! long enough to clone the current `Arc<Snapshot>`, so a running refresh
//! never blocks them.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use cc_core::CalendarConfig;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::error::{CalendarError, Result};
use crate::fetcher::{CalendarFetcher, HttpFetcher};
use crate::ics;
use crate::models::{CalendarSource, EventDefinition, Occurrence, SourceError};
use crate::snapshot::{QueryResult, RefreshReport, Snapshot, StoreStatus};

/// Aggregates calendar sources into a queryable snapshot
pub struct EventStore {
    sources: Vec<CalendarSource>,
    fetcher: Arc<dyn CalendarFetcher>,
    fetch_timeout: Duration,
    max_candidates: usize,
    lookahead_days: i64,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl EventStore {
    /// Create a store that fetches over HTTP
    pub fn new(config: &CalendarConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create with a custom fetcher
    pub fn with_fetcher(config: &CalendarConfig, fetcher: Arc<dyn CalendarFetcher>) -> Self {
        Self {
            sources: config.sources.clone(),
            fetcher,
            fetch_timeout: config.fetch_timeout(),
            max_candidates: config.max_recurrence_candidates,
            lookahead_days: config.search_lookahead_days,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    /// The snapshot currently served
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Refresh every source and publish a new snapshot.
    ///
    /// A failing source only contributes a [`SourceError`]. When every
    /// source fails the previous snapshot keeps being served.
    pub async fn refresh(&self) -> RefreshReport {
        let started = Instant::now();

        if self.sources.is_empty() {
            self.publish(Snapshot::build(Vec::new(), Vec::new(), Utc::now()));
            info!("No calendar sources configured, published empty snapshot");
            return RefreshReport {
                total_sources: 0,
                succeeded: 0,
                errors: Vec::new(),
                definition_count: 0,
                retained_previous: false,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let results = join_all(self.sources.iter().map(|source| self.load_source(source))).await;

        let mut definitions = Vec::new();
        let mut errors = Vec::new();
        let mut succeeded = 0;

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(defs) => {
                    debug!(source = %source.name, events = defs.len(), "Source loaded");
                    succeeded += 1;
                    definitions.extend(defs);
                }
                Err(e) => {
                    warn!(source = %source.name, "Calendar source failed: {}", e);
                    errors.push(SourceError::new(&source.name, e.to_string()));
                }
            }
        }

        if succeeded == 0 {
            error!(
                sources = self.sources.len(),
                "All calendar sources failed, keeping previous snapshot"
            );
            return RefreshReport {
                total_sources: self.sources.len(),
                succeeded,
                errors,
                definition_count: self.snapshot().definition_count(),
                retained_previous: true,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let snapshot = Snapshot::build(definitions, errors.clone(), Utc::now());
        let definition_count = snapshot.definition_count();
        self.publish(snapshot);

        RefreshReport {
            total_sources: self.sources.len(),
            succeeded,
            errors,
            definition_count,
            retained_previous: false,
            elapsed_ms: elapsed_ms(started),
        }
    }

    async fn load_source(&self, source: &CalendarSource) -> Result<Vec<EventDefinition>> {
        let body = self.fetcher.fetch(source, self.fetch_timeout).await?;
        ics::parse(&body, &source.name)
    }

    /// Occurrences overlapping `[start_date, end_date)`, at most `limit` of them.
    ///
    /// Dates are `YYYY-MM-DD` (UTC midnight) or RFC 3339.
    pub fn query(&self, start_date: &str, end_date: &str, limit: usize) -> Result<QueryResult> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        self.query_range(start, end, limit)
    }

    /// [`query`](Self::query) with already parsed bounds
    pub fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<QueryResult> {
        validate_window(start, end)?;
        if limit == 0 {
            return Err(CalendarError::InvalidQuery(
                "limit must be at least 1".to_string(),
            ));
        }

        let snapshot = self.snapshot();
        let (mut events, expanded_count) =
            snapshot.occurrences_in(start, end, self.max_candidates);
        events.truncate(limit);

        debug!(
            start = %start,
            end = %end,
            returned = events.len(),
            expanded = expanded_count,
            "Calendar query"
        );

        Ok(QueryResult {
            events,
            total_sources: self.sources.len(),
            errors: snapshot.source_errors.clone(),
            recurring_count: snapshot.recurring_count,
            expanded_count,
            start_date: start,
            end_date: end,
            limit,
        })
    }

    /// Occurrences whose summary contains `keyword`, ignoring case.
    ///
    /// Without a start the window begins today (UTC); without an end it spans
    /// the configured lookahead.
    pub fn search_by_keyword(
        &self,
        keyword: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<Occurrence>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CalendarError::InvalidQuery(
                "keyword must not be empty".to_string(),
            ));
        }

        let start = match start_date {
            Some(s) => parse_date(s)?,
            None => Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc(),
        };
        let end = match end_date {
            Some(s) => parse_date(s)?,
            None => chrono::Duration::try_days(self.lookahead_days)
                .and_then(|lookahead| start.checked_add_signed(lookahead))
                .ok_or_else(|| {
                    CalendarError::InvalidQuery(format!(
                        "search window starting {} is out of range",
                        start.date_naive()
                    ))
                })?,
        };
        validate_window(start, end)?;

        let needle = keyword.to_lowercase();
        let (events, _) = self.snapshot().occurrences_in(start, end, self.max_candidates);
        let matches: Vec<Occurrence> = events
            .into_iter()
            .filter(|occ| occ.matches_keyword(&needle))
            .collect();

        debug!(keyword = %keyword, matches = matches.len(), "Keyword search");
        Ok(matches)
    }

    /// Summary of the current snapshot
    pub fn status(&self) -> StoreStatus {
        let snapshot = self.snapshot();
        StoreStatus {
            refreshed_at: snapshot.refreshed_at,
            total_sources: self.sources.len(),
            single_count: snapshot.occurrence_index.len(),
            recurring_count: snapshot.recurring_count,
            error_count: snapshot.source_errors.len(),
        }
    }
}

/// Parse `YYYY-MM-DD` as UTC midnight, or an RFC 3339 timestamp
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            CalendarError::InvalidQuery(format!(
                "Invalid date '{}'. Expected YYYY-MM-DD or RFC 3339",
                input
            ))
        })
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(CalendarError::InvalidQuery(format!(
            "end date {} must be after start date {}",
            end, start
        )));
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
