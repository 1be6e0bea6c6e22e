//! Error types for the driver protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes a driver may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request or missing payload fields.
    InvalidRequest,
    /// Operation is not implemented by this driver.
    UnknownOperation,
    /// Navigation did not complete.
    NavigationFailed,
    /// The evaluated expression threw.
    EvaluationFailed,
    /// No element matched the selector.
    ElementNotFound,
    /// Anything else the driver could not classify.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::NavigationFailed => write!(f, "NAVIGATION_FAILED"),
            Self::EvaluationFailed => write!(f, "EVALUATION_FAILED"),
            Self::ElementNotFound => write!(f, "ELEMENT_NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Protocol-level failures seen by the host side.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response id '{got}' does not match request '{expected}'")]
    IdMismatch { expected: String, got: String },

    #[error("driver reported {0}")]
    Remote(ErrorPayload),
}
