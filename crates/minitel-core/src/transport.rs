//! Transport abstraction for the MiniTel-Lite client.
//!
//! The protocol runs over any ordered, bidirectional byte stream. Production
//! uses TCP; tests use turmoil's simulated TCP or in-memory duplex pipes.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens byte streams to a MiniTel-Lite server.
///
/// A stream carries no message boundaries: frames may be split across reads
/// or several may arrive in one. Reassembly happens in the orchestrator.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connected stream type.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `host:port`.
    ///
    /// Resolves once the connection is established. Connect timeouts are the
    /// driver's concern.
    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Connection lifecycle as seen by the orchestrator.
///
/// Drivers translate whatever their transport reports into these events; they
/// are the only transport input the state machine accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Bytes read from the stream, in order, with no framing guarantees
    Data(Bytes),
    /// Connect or I/O failure
    Failed {
        /// Human-readable cause
        reason: String,
    },
    /// The transport gave up waiting (connect or read timeout)
    TimedOut,
    /// Peer closed the stream
    Closed,
}
