//! Browser driver protocol.
//!
//! The smoke runner talks to a long-lived driver process over stdio, one
//! JSON request per line in, one JSON response per line out. The driver
//! owns the actual browser; this crate only defines the envelope.

pub mod envelope;
pub mod error;

pub use envelope::{
    ClickPayload, DriverRequest, DriverResponse, EvaluatePayload, GotoPayload, Operation,
    ScreenshotPayload,
};
pub use error::{ErrorCode, ErrorPayload, ProtocolError};

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: i32 = 1;
