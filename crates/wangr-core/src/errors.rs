//! Error types for data acquisition and configuration
//!
//! Every failure an acquisition can produce is folded into [`FetchError`] at the
//! executor boundary. None of these variants ever terminates a view: the
//! lifecycle controller logs them and keeps the last good snapshot on screen.
//! `FetchError` is `Clone` because a single in-flight request may be awaited by
//! several callers that joined it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Source unreachable: {0}")]
    SourceUnreachable(String),
    #[error("Source timed out")]
    SourceTimeout,
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Fetch cancelled while in flight")]
    CancelledInFlight,
}

impl FetchError {
    /// Cancellation is a discard signal, not something to report.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::CancelledInFlight)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::SourceTimeout
        } else if err.is_decode() || err.is_body() {
            FetchError::MalformedPayload(err.to_string())
        } else {
            FetchError::SourceUnreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedPayload(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for FetchError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        FetchError::SourceTimeout
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
