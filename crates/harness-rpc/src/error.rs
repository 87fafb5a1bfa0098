//! Remote call errors.

use thiserror::Error;

/// Code reported for calls that hit their own deadline.
pub const DEADLINE_EXCEEDED_CODE: i32 = 11;

/// Remote call error.
#[derive(Debug, Error)]
pub enum CallError {
    /// Network-level failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API endpoint answered with a non-success HTTP status.
    #[error("Backend returned HTTP {0}")]
    Status(u16),
    /// The call was canceled by its own timeout.
    #[error("API error 11: Deadline exceeded")]
    Timeout,
    /// The call was canceled by the caller.
    #[error("Call canceled")]
    Canceled,
    /// Logical failure reported by the backend.
    #[error("API error {code} ({service}): {detail}")]
    Application {
        service: String,
        code: i32,
        detail: String,
    },
    #[error("Envelope error: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("Payload decode error: {0}")]
    Payload(#[from] base64::DecodeError),
}

impl CallError {
    /// Classification code, for timeouts and application errors.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Timeout => Some(DEADLINE_EXCEEDED_CODE),
            Self::Application { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the call hit its own deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Whether the backend reported a logical failure.
    #[must_use]
    pub const fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }
}
