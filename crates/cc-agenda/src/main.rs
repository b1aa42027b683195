//! cc-agenda: Calendar Aggregation Main Binary
//!
//! Main entry point for the calendar aggregation service.
//!
//! Usage:
//!   cc-agenda                              - Start refresh service
//!   cc-agenda --query START END [LIMIT]    - Refresh once and print a window as JSON
//!   cc-agenda --search KEYWORD [START END] - Refresh once and print matches as JSON
//!   cc-agenda --help                       - Show help

use std::sync::Arc;

use cc_calendar::EventStore;
use cc_core::Config;
use cc_schedule::{RefreshConfig, RefreshScheduler};
use tracing_subscriber::EnvFilter;

/// Default number of events printed by `--query`
const DEFAULT_QUERY_LIMIT: usize = 100;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Background refresh until Ctrl+C
    Serve,
    /// One-shot window query
    Query {
        start: String,
        end: String,
        limit: usize,
    },
    /// One-shot keyword search
    Search {
        keyword: String,
        start: Option<String>,
        end: Option<String>,
    },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_args(&args)?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("cc-agenda {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging (stdout is reserved for JSON output)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!(
        sources = config.calendar.sources.len(),
        "Starting cc-agenda..."
    );

    let store = Arc::new(
        EventStore::new(&config.calendar)
            .map_err(|e| anyhow::anyhow!("Failed to create event store: {}", e))?,
    );

    match mode {
        RunMode::Serve => run_service(&config, store).await,
        RunMode::Query { start, end, limit } => {
            store.refresh().await;
            let result = store.query(&start, &end, limit)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        RunMode::Search {
            keyword,
            start,
            end,
        } => {
            store.refresh().await;
            let events = store.search_by_keyword(&keyword, start.as_deref(), end.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
        RunMode::Help | RunMode::Version => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: &[String]) -> anyhow::Result<RunMode> {
    let Some(first) = args.first() else {
        return Ok(RunMode::Serve);
    };

    match first.as_str() {
        "--help" | "-h" => Ok(RunMode::Help),
        "--version" | "-v" => Ok(RunMode::Version),
        "serve" => Ok(RunMode::Serve),
        "--query" | "-q" => match &args[1..] {
            [start, end] => Ok(RunMode::Query {
                start: start.clone(),
                end: end.clone(),
                limit: DEFAULT_QUERY_LIMIT,
            }),
            [start, end, limit] => Ok(RunMode::Query {
                start: start.clone(),
                end: end.clone(),
                limit: limit
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid limit: {}", limit))?,
            }),
            _ => anyhow::bail!("Usage: cc-agenda --query START END [LIMIT]"),
        },
        "--search" | "-s" => match &args[1..] {
            [keyword] => Ok(RunMode::Search {
                keyword: keyword.clone(),
                start: None,
                end: None,
            }),
            [keyword, start, end] => Ok(RunMode::Search {
                keyword: keyword.clone(),
                start: Some(start.clone()),
                end: Some(end.clone()),
            }),
            _ => anyhow::bail!("Usage: cc-agenda --search KEYWORD [START END]"),
        },
        other => anyhow::bail!("Unknown argument: {} (see --help)", other),
    }
}

/// Print help message
fn print_help() {
    println!("cc-agenda - Calendar feed aggregator");
    println!();
    println!("Usage:");
    println!("  cc-agenda                              Start refresh service");
    println!("  cc-agenda --query START END [LIMIT]    Print events in [START, END) as JSON");
    println!("  cc-agenda --search KEYWORD [START END] Print events matching KEYWORD as JSON");
    println!("  cc-agenda --help                       Show this help message");
    println!("  cc-agenda --version                    Show version");
    println!();
    println!("Dates are YYYY-MM-DD or RFC 3339.");
    println!();
    println!("Configuration is read from ./cc-agenda.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  CALENDAR_SOURCES                    Feeds as name=url,name=url");
    println!("  CALENDAR_REFRESH_INTERVAL_SECS      Refresh interval (default: 3600)");
    println!("  CALENDAR_FETCH_TIMEOUT_SECS         Per-feed timeout (default: 30)");
    println!("  CALENDAR_MAX_RECURRENCE_CANDIDATES  Recurrence expansion cap (default: 100000)");
    println!("  CALENDAR_SEARCH_LOOKAHEAD_DAYS      Default search window (default: 90)");
    println!("  RUST_LOG                            Log filter (default: info)");
}

/// Run the background refresh service until Ctrl+C
async fn run_service(config: &Config, store: Arc<EventStore>) -> anyhow::Result<()> {
    let scheduler = RefreshScheduler::new(
        Arc::clone(&store),
        RefreshConfig::from_calendar(&config.calendar),
    )?;
    let handle = scheduler.start();

    tracing::info!("cc-agenda initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    handle.stop().await;

    let status = store.status();
    tracing::info!(
        single = status.single_count,
        recurring = status.recurring_count,
        errors = status.error_count,
        "Shutdown complete"
    );
    Ok(())
}
