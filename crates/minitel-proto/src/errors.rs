//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
///
/// Every decode error means the frame must be discarded. None of them are
/// retried: a peer that sends one malformed frame is not trusted for the next.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than the smallest possible frame or body.
    #[error("frame too short: {len} bytes")]
    FrameTooShort {
        /// Bytes available (raw input or decoded body)
        len: usize,
    },

    /// Length prefix announces more bytes than were supplied.
    #[error("incomplete frame: expected {expected} bytes, got {available}")]
    IncompleteFrame {
        /// Total wire length announced by the prefix, prefix included
        expected: usize,
        /// Bytes actually supplied
        available: usize,
    },

    /// Frame text is not valid Base64.
    #[error("invalid base64 in frame body: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Recomputed digest does not match the trailing tag.
    #[error("frame digest mismatch")]
    HashMismatch,

    /// Payload would not fit behind a 16-bit length prefix once armoured.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Largest payload that still fits
        max: usize,
    },
}
