//! HTTP fetch layer
//!
//! This module performs exactly one network retrieval per call and reports how
//! it went. It handles:
//! - Building HTTP clients with the configured user agent and timeout
//! - Query-string construction for API requests
//! - Content-Type checks for crawl fetches
//! - Outcome classification (success, rate limit, transient, fatal)
//!
//! Retrying is the caller's business. Nothing here sleeps or loops.

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Graph API error codes that signal throttling rather than a bad request
const THROTTLE_ERROR_CODES: [i64; 4] = [4, 17, 32, 613];

/// What kind of body the caller is prepared to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedContent {
    /// Structured API response; no Content-Type check
    Json,
    /// Rendered page; anything that is not HTML is fatal
    Html,
    Any,
}

/// A single retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,
    /// Extra query parameters, appended in order
    pub query: Vec<(String, String)>,
    pub expect: ExpectedContent,
}

impl FetchRequest {
    /// A page fetch that must return HTML
    pub fn html(url: Url) -> Self {
        Self {
            url,
            query: Vec::new(),
            expect: ExpectedContent::Html,
        }
    }

    /// An API call with query parameters
    pub fn json(url: Url, query: Vec<(String, String)>) -> Self {
        Self {
            url,
            query,
            expect: ExpectedContent::Json,
        }
    }

    /// The URL with all query parameters applied
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }

    /// Looks up a query parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Why a fetch did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server error: HTTP {0}")]
    ServerError(u16),

    #[error("client error: HTTP {status}: {message}")]
    ClientError { status: u16, message: String },

    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Body retrieved and acceptable for the request
    Success {
        status: u16,
        headers: HeaderMap,
        body: String,
        /// Content-Type header value ("" when absent)
        content_type: String,
        /// URL after redirects
        final_url: Url,
    },

    /// The platform asked us to slow down
    RateLimited {
        /// `Retry-After`, when the server sent one in seconds
        retry_after: Option<Duration>,
    },

    /// Timeout, connection failure or 5xx; the same request may work later
    TransientError { cause: FetchFailure },

    /// The request itself is bad or the response is unusable
    FatalError { cause: FetchFailure },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientError { .. } => "transient_error",
            Self::FatalError { .. } => "fatal_error",
        }
    }
}

/// Performs one retrieval
///
/// Implementations never retry and never panic; every failure is folded into a
/// [`FetchOutcome`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for &F {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        (**self).fetch(request).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use adlib_harvest::config::FetchConfig;
/// use adlib_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let response = match self.client.get(request.full_url()).send().await {
            Ok(response) => response,
            Err(e) => return classify_send_error(&e),
        };

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::RateLimited {
                retry_after: parse_retry_after(&headers),
            };
        }

        if status.is_server_error() {
            return FetchOutcome::TransientError {
                cause: FetchFailure::ServerError(status.as_u16()),
            };
        }

        if !status.is_success() {
            // Throttling may arrive as a 400/403 carrying a Graph error code
            let body = response.text().await.unwrap_or_default();
            if matches!(status, StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN)
                && is_throttle_body(&body)
            {
                return FetchOutcome::RateLimited {
                    retry_after: parse_retry_after(&headers),
                };
            }
            return FetchOutcome::FatalError {
                cause: FetchFailure::ClientError {
                    status: status.as_u16(),
                    message: error_message(&body),
                },
            };
        }

        if request.expect == ExpectedContent::Html && !is_html_content_type(&content_type) {
            return FetchOutcome::FatalError {
                cause: FetchFailure::UnsupportedContent(content_type),
            };
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success {
                status: status.as_u16(),
                headers,
                body,
                content_type,
                final_url,
            },
            Err(e) if e.is_timeout() => FetchOutcome::TransientError {
                cause: FetchFailure::Timeout,
            },
            Err(e) => FetchOutcome::TransientError {
                cause: FetchFailure::Body(e.to_string()),
            },
        }
    }
}

fn classify_send_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::TransientError {
            cause: FetchFailure::Timeout,
        }
    } else if e.is_connect() {
        FetchOutcome::TransientError {
            cause: FetchFailure::Connect(e.to_string()),
        }
    } else if e.is_builder() || e.is_redirect() {
        FetchOutcome::FatalError {
            cause: FetchFailure::Request(e.to_string()),
        }
    } else {
        FetchOutcome::TransientError {
            cause: FetchFailure::Request(e.to_string()),
        }
    }
}

/// Returns true for HTML or XHTML content types
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

/// Reads a `Retry-After` header given in seconds
///
/// HTTP-date values are ignored; callers fall back to their own cooldown.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Returns true if an error body carries one of the Graph throttling codes
pub fn is_throttle_body(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("code")?.as_i64())
        .is_some_and(|code| THROTTLE_ERROR_CODES.contains(&code))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_full_url_appends_query() {
        let request = FetchRequest::json(
            Url::parse("https://api.example.com/ads?x=1").unwrap(),
            vec![
                ("limit".to_string(), "2".to_string()),
                ("search_terms".to_string(), "red shoes".to_string()),
            ],
        );
        let url = request.full_url();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("x".to_string(), "1".to_string()));
        assert_eq!(pairs[1], ("limit".to_string(), "2".to_string()));
        assert_eq!(pairs[2], ("search_terms".to_string(), "red shoes".to_string()));
        assert_eq!(request.param("limit"), Some("2"));
        assert_eq!(request.param("after"), None);
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("Text/HTML"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(!is_html_content_type("application/json"));
        assert!(!is_html_content_type(""));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(120)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_throttle_body() {
        assert!(is_throttle_body(
            r#"{"error":{"message":"Application request limit reached","code":4}}"#
        ));
        assert!(is_throttle_body(r#"{"error":{"code":613}}"#));
        assert!(!is_throttle_body(r#"{"error":{"message":"Invalid parameter","code":100}}"#));
        assert!(!is_throttle_body("not json"));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid OAuth access token","code":190}}"#),
            "Invalid OAuth access token"
        );
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
