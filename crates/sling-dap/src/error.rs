//! DAP error types.

use thiserror::Error;

/// Errors from DAP client operations.
///
/// Every per-request failure is returned to the caller that issued the
/// request; nothing here is broadcast.
#[derive(Debug, Error)]
pub enum DapError {
    /// The channel is not open, or closed before the request completed.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response arrived within the request timeout.
    #[error("request timed out: {command} (seq {seq})")]
    Timeout {
        /// The command that timed out.
        command: String,
        /// Sequence number of the request.
        seq: i64,
    },

    /// The adapter answered with `success: false`.
    #[error("{command} failed: {message}")]
    RequestFailed {
        /// The command that failed.
        command: String,
        /// The adapter's reason, or a default if it sent none.
        message: String,
    },

    /// A successful response whose body does not have the expected shape.
    #[error("adapter sent invalid response: {0}")]
    InvalidResponse(String),

    /// Outgoing message could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Inbound frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl DapError {
    /// True for [`DapError::Timeout`], so a UI can tell a hung adapter
    /// apart from one that rejected the request.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DapError::Timeout { .. })
    }
}

/// A malformed inbound frame. Logged and dropped by the client.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Invalid JSON, an unknown `type` discriminator, or missing fields.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad Content-Length header. The stream cannot be resynchronised.
    #[error("framing error: {0}")]
    Framing(String),

    /// A frame with a valid header but an unusable body. `consumed`
    /// covers the whole frame, so reading can resume after it.
    #[error("bad frame body: {reason}")]
    Body {
        /// What was wrong with the body.
        reason: String,
        /// Length of the frame, header included.
        consumed: usize,
    },

    /// Not enough bytes buffered to hold a complete frame.
    #[error("incomplete frame: {0}")]
    Incomplete(String),
}
