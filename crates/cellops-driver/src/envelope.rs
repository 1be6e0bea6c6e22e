//! Request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorPayload, ProtocolError};
use crate::PROTOCOL_VERSION;

/// Driver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Load a URL and wait for the network to settle
    Goto,
    /// Evaluate a JavaScript expression, returning its JSON value
    Evaluate,
    /// Click the first element matching a CSS selector
    Click,
    /// Save a screenshot of the page
    Screenshot,
    /// Return and clear console messages captured since the last call
    Console,
    /// Close the browser and exit
    Close,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Goto => "goto",
            Operation::Evaluate => "evaluate",
            Operation::Click => "click",
            Operation::Screenshot => "screenshot",
            Operation::Console => "console",
            Operation::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GotoPayload {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatePayload {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickPayload {
    pub selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    pub path: String,
}

/// One request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRequest {
    pub protocol_version: i32,
    pub request_id: String,
    pub op: Operation,
    #[serde(default)]
    pub payload: Value,
}

impl DriverRequest {
    pub fn new(request_id: impl Into<String>, op: Operation, payload: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            request_id: request_id.into(),
            op,
            payload,
        }
    }

    /// Build a request from a typed payload.
    pub fn with_payload<T: Serialize>(
        request_id: impl Into<String>,
        op: Operation,
        payload: &T,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(request_id, op, serde_json::to_value(payload)?))
    }

    /// Serialize as a single line (no trailing newline).
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One response line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverResponse {
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl DriverResponse {
    pub fn success(request_id: impl Into<String>, payload: Value) -> Self {
        Self {
            request_id: request_id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: ErrorPayload) -> Self {
        Self {
            request_id: request_id.into(),
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Check correlation and unwrap the payload (`null` when absent).
    pub fn into_payload(self, expected_id: &str) -> Result<Value, ProtocolError> {
        if self.request_id != expected_id {
            return Err(ProtocolError::IdMismatch {
                expected: expected_id.to_string(),
                got: self.request_id,
            });
        }

        if !self.ok {
            let error = self.error.unwrap_or_else(|| ErrorPayload {
                code: crate::ErrorCode::Internal,
                message: "driver returned ok=false without an error body".to_string(),
            });
            return Err(ProtocolError::Remote(error));
        }

        Ok(self.payload.unwrap_or(Value::Null))
    }
}
