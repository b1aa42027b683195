//! ICS feed retrieval
//!
//! One GET per call with a bounded timeout. Failures come back as error
//! values; retrying is left to the next refresh cycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{CalendarError, Result};
use crate::models::CalendarSource;

/// Retrieves the raw ICS text of one source
#[async_trait]
pub trait CalendarFetcher: Send + Sync {
    /// Fetch the feed body, failing after `timeout`
    async fn fetch(&self, source: &CalendarSource, timeout: Duration) -> Result<String>;
}

/// HTTP(S) fetcher backed by reqwest
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cc-agenda/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, source: &CalendarSource, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/calendar, text/plain;q=0.9, */*;q=0.8")
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(source = %source.name, "Calendar request failed: {}", status);
            return Err(CalendarError::HttpError(format!("Request failed: {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CalendarError::HttpError(e.to_string()))?;

        String::from_utf8(body.to_vec()).map_err(|e| CalendarError::InvalidEncoding(e.to_string()))
    }
}

#[async_trait]
impl CalendarFetcher for HttpFetcher {
    async fn fetch(&self, source: &CalendarSource, timeout: Duration) -> Result<String> {
        let url = normalize_url(&source.url)?;

        debug!(source = %source.name, url = %url, "Fetching calendar");

        let body = tokio::time::timeout(timeout, self.get(source, &url))
            .await
            .map_err(|_| CalendarError::Timeout(timeout))??;

        debug!(source = %source.name, bytes = body.len(), "Fetched calendar");
        Ok(body)
    }
}

/// Validate a feed URL, mapping `webcal://` to `https://`
pub fn normalize_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| CalendarError::Configuration(format!("Invalid URL '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        "webcal" | "webcals" => {
            let rest = &parsed.as_str()[parsed.scheme().len()..];
            Ok(format!("https{}", rest))
        }
        other => Err(CalendarError::Configuration(format!(
            "Unsupported URL scheme '{}' for {}",
            other, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("webcal://example.com/cal.ics").unwrap(),
            "https://example.com/cal.ics"
        );
        assert_eq!(
            normalize_url("https://example.com/a.ics?x=1").unwrap(),
            "https://example.com/a.ics?x=1"
        );
        assert!(normalize_url("ftp://example.com/cal.ics").is_err());
        assert!(normalize_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/work.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let source = CalendarSource::new("work", format!("{}/work.ics", server.uri()));

        let body = tokio_test::assert_ok!(fetcher.fetch(&source, Duration::from_secs(5)).await);
        assert_eq!(body, BODY);
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let source = CalendarSource::new("missing", format!("{}/missing.ics", server.uri()));

        let err = fetcher.fetch(&source, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CalendarError::HttpError(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(BODY)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let source = CalendarSource::new("slow", format!("{}/slow.ics", server.uri()));

        let err = fetcher.fetch(&source, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, CalendarError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_utf8() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let source = CalendarSource::new("binary", format!("{}/binary.ics", server.uri()));

        let err = fetcher.fetch(&source, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CalendarError::InvalidEncoding(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_scheme() {
        let fetcher = HttpFetcher::new().unwrap();
        let source = CalendarSource::new("ftp", "ftp://example.com/cal.ics");

        let err = fetcher.fetch(&source, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CalendarError::Configuration(_)));
    }
}
