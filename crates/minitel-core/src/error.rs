//! Handshake error types.

use std::time::Duration;

use minitel_proto::{Command, ProtocolError};
use thiserror::Error;

use crate::orchestrator::HandshakeState;

/// Terminal failure of a handshake attempt.
///
/// Every variant is fatal for the connection and none is retried inside the
/// core. Retrying means running a fresh [`crate::Orchestrator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The transport could not establish a connection.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Transport-reported cause
        reason: String,
    },

    /// No valid response arrived within the response window.
    #[error("timed out after {timeout:?} waiting for a response to {command}")]
    ResponseTimeout {
        /// Command left unanswered
        command: Command,
        /// Configured response window
        timeout: Duration,
    },

    /// An inbound frame failed to decode or verify.
    #[error("invalid frame: {0}")]
    Frame(#[from] ProtocolError),

    /// The peer broke the turn-taking counter.
    #[error("nonce mismatch: expected {expected}, received {received}")]
    NonceMismatch {
        /// Nonce the next inbound frame had to carry
        expected: u32,
        /// Nonce it actually carried
        received: u32,
    },

    /// A valid frame of the wrong kind for the current step.
    #[error("unexpected response {received}, expected {expected}")]
    UnexpectedResponse {
        /// Response this step required
        expected: Command,
        /// Response the peer sent
        received: Command,
    },

    /// The transport failed after the connection was up.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Transport-reported cause
        reason: String,
    },

    /// The peer closed the stream while a response was outstanding.
    #[error("connection closed while awaiting {awaiting}")]
    ConnectionClosed {
        /// Response that never came
        awaiting: Command,
    },

    /// The orchestrator contract was violated.
    #[error(transparent)]
    Internal(#[from] OrchestratorError),
}

/// Misuse of the orchestrator API.
///
/// These are programming errors, not peer behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Operation not allowed in the current state.
    #[error("invalid state {state:?} for operation {operation}")]
    InvalidState {
        /// State at the time of the call
        state: HandshakeState,
        /// Operation attempted
        operation: &'static str,
    },

    /// A second command was issued while one is still unanswered.
    #[error("{attempted} issued while {pending} is still in flight")]
    CommandInFlight {
        /// Command still awaiting its response
        pending: Command,
        /// Command that was refused
        attempted: Command,
    },

    /// A command frame could not be encoded.
    #[error("failed to encode command: {0}")]
    Encode(ProtocolError),
}
