//! Error types for cc-calendar

use thiserror::Error;

/// cc-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;
