//! Protocol error types.

use thiserror::Error;

/// Errors raised while building, encoding or parsing V2 frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame prefix: expected 'V2 '")]
    InvalidPrefix,

    #[error("invalid frame format: expected at least 3 fields, got {0}")]
    InvalidFormat(usize),

    #[error("invalid body length {value:?}: {source}")]
    InvalidBodyLength {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid checksum format: {0:?}")]
    InvalidChecksumFormat(String),

    #[error("invalid body format: expected request id and code")]
    InvalidBody,

    #[error("unexpected trailing field: {0:?}")]
    UnexpectedField(String),

    #[error("invalid payload encoding: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("checksum mismatch: frame carries {expected}, body hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("body length mismatch: frame declares {declared}, body is {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("invalid request id: {0:?}")]
    InvalidRequestId(String),

    #[error("line too long: {size} bytes (max {max})")]
    LineTooLong { size: usize, max: usize },

    #[error("invalid UTF-8 in frame")]
    InvalidUtf8,

    #[error("failed to generate request id: {0}")]
    Entropy(#[from] rand::Error),
}

impl ProtocolError {
    /// Returns whether the frame was well formed but failed an integrity check.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ProtocolError::ChecksumMismatch { .. } | ProtocolError::LengthMismatch { .. }
        )
    }
}
