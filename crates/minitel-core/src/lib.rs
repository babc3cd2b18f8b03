//! MiniTel-Lite protocol core logic
//!
//! Pure state machine logic for the MiniTel-Lite client, decoupled from I/O.
//!
//! # Architecture
//!
//! The [`Orchestrator`] never touches a socket or a clock. Time is passed in,
//! transport activity arrives as [`TransportEvent`]s, and every transition
//! returns [`OrchestratorAction`]s describing what should happen next (open
//! the connection, write these bytes, record this frame, tell the caller,
//! close). A driver interprets those actions against a real or simulated
//! transport.
//!
//! The same state machine therefore runs unchanged under tokio, under the
//! turmoil simulation harness, and in plain unit tests that feed it events by
//! hand.
//!
//! # Components
//!
//! - [`nonce`]: Turn-taking counter shared with the peer
//! - [`orchestrator`]: HELLO → DUMP → DUMP → STOP state machine
//! - [`event`]: Progress and outcome reporting for callers
//! - [`mod@env`]: Environment abstraction (time)
//! - [`transport`]: Transport abstraction (streams) and transport events
//! - [`error`]: Handshake and contract error types

pub mod env;
pub mod error;
pub mod event;
pub mod nonce;
pub mod orchestrator;
pub mod transport;

pub use env::Environment;
pub use error::{HandshakeError, OrchestratorError};
pub use event::{HandshakeEvent, Outcome, Progress};
pub use nonce::NonceSequencer;
pub use orchestrator::{
    HandshakeState, Orchestrator, OrchestratorAction, OrchestratorConfig, PendingCommand,
};
pub use transport::{Transport, TransportEvent};
