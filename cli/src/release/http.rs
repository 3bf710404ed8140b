//! HTTP transport seam.
//!
//! The fetcher talks to the network only through [`HttpClient`], so retry and
//! rate-limit behaviour can be exercised in tests with scripted responses.
//! [`UreqClient`] is the production implementation.
use std::fmt;
use std::io::Read;
use std::time::Duration;

use thiserror::Error;

/// Rate-limit headers reported by the releases API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// `x-ratelimit-limit`: requests allowed per window.
    pub limit: Option<u64>,
    /// `x-ratelimit-remaining`: requests left in the current window.
    pub remaining: Option<u64>,
    /// `x-ratelimit-reset`: UNIX time (seconds) at which the window resets.
    pub reset: Option<u64>,
}

impl RateLimit {
    /// Build from raw header values; unparsable values are treated as absent.
    #[must_use]
    pub fn from_header_values(
        limit: Option<&str>,
        remaining: Option<&str>,
        reset: Option<&str>,
    ) -> Self {
        let parse = |value: Option<&str>| value.and_then(|v| v.trim().parse().ok());
        Self {
            limit: parse(limit),
            remaining: parse(remaining),
            reset: parse(reset),
        }
    }

    /// Whether the remaining quota is reported as exactly zero.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }

    /// Whether no rate-limit header was present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(limit) = self.limit {
            parts.push(format!("x-ratelimit-limit: {limit}"));
        }
        if let Some(remaining) = self.remaining {
            parts.push(format!("x-ratelimit-remaining: {remaining}"));
        }
        if let Some(reset) = self.reset {
            let when = i64::try_from(reset)
                .ok()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map_or_else(String::new, |dt| {
                    format!(" ({})", dt.format("%Y-%m-%d %H:%M:%S UTC"))
                });
            parts.push(format!("x-ratelimit-reset: {reset}{when}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// A response whose body has not been read yet.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Rate-limit headers.
    pub rate_limit: RateLimit,
    /// Streaming response body.
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

/// The request never produced a response (DNS, connect, TLS, timeout, ...).
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Minimal blocking HTTP GET interface.
pub trait HttpClient: Send + fmt::Debug {
    /// Issue a GET request.
    ///
    /// Non-success statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received.
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpClient`] backed by a [`ureq::Agent`].
///
/// Every request carries the configured `User-Agent`. Requests to the API
/// host additionally carry the JSON `Accept` header and, when a token is
/// configured, an `Authorization: Bearer` header; asset downloads from other
/// hosts never see the token.
pub struct UreqClient {
    agent: ureq::Agent,
    api_url: String,
    user_agent: String,
    token: Option<String>,
}

impl UreqClient {
    /// Create a client for the API rooted at `api_url`.
    #[must_use]
    pub fn new(api_url: &str, user_agent: &str, token: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_url: api_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            token,
        }
    }

    fn is_api_request(&self, url: &str) -> bool {
        url.starts_with(&self.api_url)
    }
}

impl fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqClient")
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

fn header_value<'a>(headers: &'a ureq::http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str());
        if self.is_api_request(url) {
            request = request.header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {token}"));
            }
        }

        let response = request.call().map_err(|e| TransportError(e.to_string()))?;
        let headers = response.headers();
        let rate_limit = RateLimit::from_header_values(
            header_value(headers, "x-ratelimit-limit"),
            header_value(headers, "x-ratelimit-remaining"),
            header_value(headers, "x-ratelimit-reset"),
        );
        let status = response.status().as_u16();
        let body = response.into_body().into_reader();
        Ok(HttpResponse {
            status,
            rate_limit,
            body: Box::new(body),
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_parses_headers() {
        let rl = RateLimit::from_header_values(Some("60"), Some("0"), Some("1700000000"));
        assert_eq!(rl.limit, Some(60));
        assert!(rl.is_exhausted());
        assert_eq!(rl.reset, Some(1_700_000_000));
    }

    #[test]
    fn rate_limit_ignores_garbage() {
        let rl = RateLimit::from_header_values(Some("lots"), None, Some(""));
        assert!(rl.is_empty());
        assert!(!rl.is_exhausted());
    }

    #[test]
    fn remaining_nonzero_is_not_exhausted() {
        let rl = RateLimit::from_header_values(None, Some("3"), None);
        assert!(!rl.is_exhausted());
        assert!(!rl.is_empty());
    }

    #[test]
    fn rate_limit_display_formats_reset_time() {
        let rl = RateLimit {
            limit: None,
            remaining: Some(0),
            reset: Some(86_400),
        };
        assert_eq!(
            rl.to_string(),
            "x-ratelimit-remaining: 0, x-ratelimit-reset: 86400 (1970-01-02 00:00:00 UTC)"
        );
    }

    #[test]
    fn success_range() {
        let response = |status| HttpResponse {
            status,
            rate_limit: RateLimit::default(),
            body: Box::new(std::io::empty()),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(302).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn debug_redacts_token() {
        let client = UreqClient::new(
            "https://api.github.com/",
            "envkit-test",
            Some("ghp_secret".to_string()),
            Duration::from_secs(5),
        );
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
        assert!(client.is_api_request("https://api.github.com/repos/a/b/releases"));
        assert!(!client.is_api_request("https://objects.githubusercontent.com/x"));
    }
}
