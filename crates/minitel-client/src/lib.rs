//! MiniTel-Lite client runtime.
//!
//! Runs the [`minitel_core::Orchestrator`] against a real byte stream:
//!
//! - [`HandshakeDriver`]: executes orchestrator actions, feeds transport events
//!   back, enforces connect and response deadlines
//! - [`TcpTransport`]: production transport over tokio TCP
//! - [`JsonSessionRecorder`]: persists every frame of an attempt as JSON
//! - [`ClientConfig`]: target address and timeouts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod env;
pub mod recorder;
pub mod transport;

pub use config::ClientConfig;
pub use driver::HandshakeDriver;
pub use env::SystemEnv;
pub use minitel_core::{HandshakeError, HandshakeEvent, Outcome, Progress};
pub use recorder::{
    DecodedFrame, Direction, JsonSessionRecorder, RecorderError, SessionRecorder,
    SessionRecording, Step,
};
pub use transport::TcpTransport;

/// Run one handshake attempt over TCP with wall-clock time.
pub async fn run_handshake(config: ClientConfig) -> Outcome {
    HandshakeDriver::new(TcpTransport, SystemEnv, config).run().await
}
