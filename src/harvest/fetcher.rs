//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building one HTTP client that is reused (connection pool included) for the whole run
//! - GET requests for sitemaps and product pages
//! - Error classification into transient and permanent failures
//! - Retrying transient failures through a [`RetryPolicy`]

use crate::config::{Config, HttpConfig};
use crate::harvest::RetryPolicy;
use reqwest::Client;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection error for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },
}

/// Retry classification of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection failures (refused, reset or closed early) and HTTP error statuses
    Transient,
    /// Everything else
    Permanent,
}

impl FetchError {
    /// Classifies a reqwest error raised while fetching `url`
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if let Some(status) = error.status() {
            FetchError::Status {
                url,
                status: status.as_u16(),
            }
        } else if error.is_connect() {
            // Connect timeouts land here too
            FetchError::Connect {
                url,
                message: error.to_string(),
            }
        } else if (error.is_request() || error.is_body()) && is_dropped_connection(&error) {
            FetchError::Connect {
                url,
                message: error.to_string(),
            }
        } else if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_body() || error.is_decode() {
            FetchError::Body {
                url,
                message: error.to_string(),
            }
        } else {
            FetchError::Request {
                url,
                message: error.to_string(),
            }
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Connect { .. } | FetchError::Status { .. } => FetchErrorKind::Transient,
            FetchError::Timeout { .. } | FetchError::Body { .. } | FetchError::Request { .. } => {
                FetchErrorKind::Permanent
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FetchErrorKind::Transient
    }
}

/// True when the server accepted the connection and then closed or reset it
fn is_dropped_connection(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(hyper_error) = cause.downcast_ref::<hyper::Error>() {
            if hyper_error.is_incomplete_message() || hyper_error.is_closed() {
                return true;
            }
        }
        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io_error.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Session-scoped page fetcher
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.http)?;
        Ok(Self::new(client, RetryPolicy::from_config(&config.retry)))
    }

    /// Fetches `url` and returns its body as text
    ///
    /// Transient failures are retried according to the policy; the last
    /// error is returned once attempts run out.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.policy.run(url, || self.fetch_once(url)).await
    }

    /// One GET request; non-2xx statuses are errors
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
