//! Error types for E2E testing

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An awaited condition never became true before the deadline.
    #[error("{subject} did not reach {expected} within {}ms", timeout.as_millis())]
    DeadlineExceeded {
        subject: String,
        expected: String,
        timeout: Duration,
    },

    /// Required configuration is absent; raised before any wait starts.
    #[error("Missing configuration: {0}")]
    PreconditionMissing(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Teardown failed: {0}")]
    Teardown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

impl E2eError {
    /// Shorthand used by the deadline-bound waits.
    pub fn deadline(subject: impl Into<String>, expected: impl Into<String>, timeout: Duration) -> Self {
        E2eError::DeadlineExceeded {
            subject: subject.into(),
            expected: expected.into(),
            timeout,
        }
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self, E2eError::DeadlineExceeded { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
