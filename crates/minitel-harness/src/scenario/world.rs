//! World state after scenario execution.
//!
//! The World captures what both sides observed during one simulated attempt:
//! the client's outcome and event stream, and the frames the scripted peer
//! received.

use std::time::Duration;

use minitel_core::{HandshakeEvent, Outcome};
use minitel_proto::Command;

/// Everything a scenario observed.
#[derive(Debug, Clone)]
pub struct World {
    outcome: Outcome,
    events: Vec<HandshakeEvent>,
    server_received: Vec<(Command, u32)>,
    elapsed: Duration,
}

impl World {
    /// Assemble the world from a finished attempt.
    pub fn new(
        outcome: Outcome,
        events: Vec<HandshakeEvent>,
        server_received: Vec<(Command, u32)>,
        elapsed: Duration,
    ) -> Self {
        Self { outcome, events, server_received, elapsed }
    }

    /// Terminal outcome returned by the driver.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Events the driver emitted, in order.
    pub fn events(&self) -> &[HandshakeEvent] {
        &self.events
    }

    /// `(command, nonce)` pairs the peer received, in order.
    pub fn server_received(&self) -> &[(Command, u32)] {
        &self.server_received
    }

    /// Simulated time the attempt took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Override codes announced through events.
    pub fn announced_codes(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HandshakeEvent::OverrideCode(code) => Some(code.as_str()),
                _ => None,
            })
            .collect()
    }
}
