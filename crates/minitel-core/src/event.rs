//! Caller-facing handshake events.

use std::fmt;

use minitel_proto::Command;

use crate::error::HandshakeError;

/// Progress notification for a meaningful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Opening the transport
    Connecting,
    /// Transport is up
    Connected,
    /// A command went out
    Sent {
        /// Command sent
        command: Command,
        /// Nonce it carried
        nonce: u32,
    },
    /// The expected response arrived and the step succeeded
    Received {
        /// Response received
        command: Command,
        /// Nonce it carried
        nonce: u32,
    },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Sent { command, nonce } => write!(f, "sent {command} (nonce {nonce})"),
            Self::Received { command, nonce } => write!(f, "received {command} (nonce {nonce})"),
        }
    }
}

/// Terminal result of one handshake attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All four steps succeeded.
    Completed {
        /// Code delivered by the second DUMP
        override_code: String,
    },
    /// The attempt failed.
    ///
    /// A code obtained before the failure (e.g. STOP went wrong after DUMP
    /// succeeded) is still valid and carried here.
    Failed {
        /// What went wrong
        error: HandshakeError,
        /// Code obtained before the failure, if any
        override_code: Option<String>,
    },
}

impl Outcome {
    /// Override code, whether or not the attempt completed.
    pub fn override_code(&self) -> Option<&str> {
        match self {
            Self::Completed { override_code } => Some(override_code),
            Self::Failed { override_code, .. } => override_code.as_deref(),
        }
    }

    /// Error, if the attempt failed.
    pub fn error(&self) -> Option<&HandshakeError> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// True if every step succeeded.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Event reported to whoever drives or observes an attempt.
///
/// Exactly one [`HandshakeEvent::Finished`] is emitted per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// Status update
    Progress(Progress),
    /// Override code obtained; reported as soon as it arrives, before STOP
    OverrideCode(String),
    /// Terminal outcome
    Finished(Outcome),
}

impl HandshakeEvent {
    /// True for the terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}
