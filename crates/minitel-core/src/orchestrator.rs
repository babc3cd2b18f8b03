//! Handshake state machine for the MiniTel-Lite client.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods accept time as a parameter (no stored clock)
//! - Transport activity arrives as [`TransportEvent`]s
//! - Transitions return `Vec<OrchestratorAction>` for a driver to execute
//!
//! # State Machine
//!
//! ```text
//! Idle
//!  │ start: reset nonces, open transport
//!  ↓
//! Connecting
//!  │ Connected
//!  ↓
//! Connected
//!  │ send HELLO
//!  ↓
//! AwaitingHelloAck
//!  │ HELLO_ACK, send DUMP
//!  ↓
//! AwaitingFirstDump
//!  │ DUMP_FAILED, send DUMP
//!  ↓
//! AwaitingSecondDump
//!  │ DUMP_OK, surface override code, send STOP
//!  ↓
//! AwaitingStopOk
//!  │ STOP_OK, close
//!  ↓
//! Done
//! ```
//!
//! Any failure in a non-terminal state moves to `Error`. `Done` and `Error`
//! absorb every later event and tick, so a timeout can never fire after
//! teardown.
//!
//! # Lock-step
//!
//! Exactly one command is in flight at a time and every response is checked
//! against the single response kind the current step allows. A wrong nonce, a
//! wrong kind, or a frame that fails verification ends the attempt: a peer that
//! drifts out of step is not given the chance to steer the client.

use std::time::{Duration, Instant};

use bytes::Bytes;
use minitel_proto::{Command, Frame, FrameBuffer};
use tracing::{debug, info, trace, warn};

use crate::{
    error::{HandshakeError, OrchestratorError},
    event::{HandshakeEvent, Outcome, Progress},
    nonce::NonceSequencer,
    transport::TransportEvent,
};

/// Actions returned by the orchestrator.
///
/// The driver executes them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorAction {
    /// Open the transport; report the result as a [`TransportEvent`]
    OpenTransport,

    /// Record the frame, then write `wire` to the transport
    Send {
        /// Encoded frame
        wire: Bytes,
        /// Frame that `wire` encodes
        frame: Frame,
    },

    /// Record a frame read from the transport
    RecordInbound {
        /// Raw wire bytes of one frame
        wire: Bytes,
        /// Decoded frame, `None` if it failed to decode or verify
        frame: Option<Frame>,
    },

    /// Report an event to the caller
    Emit(HandshakeEvent),

    /// Close the transport; it is never reopened
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Not started
    Idle,
    /// Transport opening
    Connecting,
    /// Transport up, HELLO not yet sent
    Connected,
    /// HELLO sent
    AwaitingHelloAck,
    /// First DUMP sent; DUMP_FAILED is the expected answer
    AwaitingFirstDump,
    /// Second DUMP sent; DUMP_OK carries the override code
    AwaitingSecondDump,
    /// STOP sent
    AwaitingStopOk,
    /// Sequence completed
    Done,
    /// Attempt failed
    Error,
}

impl HandshakeState {
    /// True for `Done` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// The only response accepted in this state.
    pub fn expected_response(self) -> Option<Command> {
        match self {
            Self::AwaitingHelloAck => Some(Command::HelloAck),
            Self::AwaitingFirstDump => Some(Command::DumpFailed),
            Self::AwaitingSecondDump => Some(Command::DumpOk),
            Self::AwaitingStopOk => Some(Command::StopOk),
            _ => None,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long each command waits for its response
    pub response_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { response_timeout: Duration::from_secs(5) }
    }
}

/// The command currently awaiting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    /// Command sent
    pub command: Command,
    /// Nonce it carried
    pub nonce: u32,
    /// Only acceptable response
    pub expected: Command,
    /// When the response window closes
    pub deadline: Instant,
}

/// HELLO → DUMP → DUMP → STOP state machine.
///
/// One instance per attempt. A fresh attempt needs a fresh orchestrator;
/// nothing here reconnects.
#[derive(Debug)]
pub struct Orchestrator {
    state: HandshakeState,
    config: OrchestratorConfig,
    nonces: NonceSequencer,
    /// Clearing this is what cancels the response timer
    pending: Option<PendingCommand>,
    inbound: FrameBuffer,
    override_code: Option<String>,
    outcome: Option<Outcome>,
}

impl Orchestrator {
    /// Create an orchestrator in `Idle` state.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            state: HandshakeState::Idle,
            config,
            nonces: NonceSequencer::new(),
            pending: None,
            inbound: FrameBuffer::new(),
            override_code: None,
            outcome: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Command awaiting its response, if any.
    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Nonce counters.
    pub fn nonces(&self) -> &NonceSequencer {
        &self.nonces
    }

    /// Override code, once DUMP_OK has arrived.
    pub fn override_code(&self) -> Option<&str> {
        self.override_code.as_deref()
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// When the pending command times out.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.deadline)
    }

    /// Begin the attempt.
    ///
    /// Resets the nonce counters and asks the driver to open the transport.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the orchestrator is `Idle`.
    pub fn start(&mut self) -> Result<Vec<OrchestratorAction>, OrchestratorError> {
        if self.state != HandshakeState::Idle {
            return Err(OrchestratorError::InvalidState {
                state: self.state,
                operation: "start",
            });
        }

        self.nonces.reset();
        self.inbound.clear();
        self.override_code = None;
        self.state = HandshakeState::Connecting;

        Ok(vec![
            OrchestratorAction::Emit(HandshakeEvent::Progress(Progress::Connecting)),
            OrchestratorAction::OpenTransport,
        ])
    }

    /// Feed a transport event.
    ///
    /// Events before `start` or after a terminal state are ignored.
    pub fn handle_event(&mut self, event: TransportEvent, now: Instant) -> Vec<OrchestratorAction> {
        if self.state == HandshakeState::Idle || self.state.is_terminal() {
            trace!(state = ?self.state, ?event, "ignoring transport event");
            return Vec::new();
        }

        match event {
            TransportEvent::Connected => self.on_connected(now),
            TransportEvent::Data(data) => self.on_data(&data, now),
            TransportEvent::Failed { reason } => {
                if self.state == HandshakeState::Connecting {
                    self.fail(HandshakeError::ConnectionFailed { reason })
                } else {
                    self.fail(HandshakeError::ConnectionLost { reason })
                }
            },
            TransportEvent::TimedOut => match self.pending {
                Some(pending) => self.fail(HandshakeError::ResponseTimeout {
                    command: pending.command,
                    timeout: self.config.response_timeout,
                }),
                None if self.state == HandshakeState::Connecting => {
                    self.fail(HandshakeError::ConnectionFailed {
                        reason: "connect timed out".to_string(),
                    })
                },
                None => self.fail(HandshakeError::ConnectionLost {
                    reason: "transport timed out".to_string(),
                }),
            },
            TransportEvent::Closed => match self.pending {
                Some(pending) => {
                    self.fail(HandshakeError::ConnectionClosed { awaiting: pending.expected })
                },
                None if self.state == HandshakeState::Connecting => {
                    self.fail(HandshakeError::ConnectionFailed {
                        reason: "connection closed before it was established".to_string(),
                    })
                },
                None => self.fail(HandshakeError::ConnectionLost {
                    reason: "connection closed".to_string(),
                }),
            },
        }
    }

    /// Check the response deadline.
    ///
    /// Call whenever the driver's wait for the deadline ends.
    pub fn tick(&mut self, now: Instant) -> Vec<OrchestratorAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match self.pending {
            Some(pending) if now >= pending.deadline => {
                self.fail(HandshakeError::ResponseTimeout {
                    command: pending.command,
                    timeout: self.config.response_timeout,
                })
            },
            _ => Vec::new(),
        }
    }

    fn on_connected(&mut self, now: Instant) -> Vec<OrchestratorAction> {
        if self.state != HandshakeState::Connecting {
            debug!(state = ?self.state, "ignoring duplicate connected event");
            return Vec::new();
        }

        self.state = HandshakeState::Connected;
        let mut actions =
            vec![OrchestratorAction::Emit(HandshakeEvent::Progress(Progress::Connected))];
        actions.extend(self.issue(Command::Hello, HandshakeState::AwaitingHelloAck, now));
        actions
    }

    fn on_data(&mut self, data: &[u8], now: Instant) -> Vec<OrchestratorAction> {
        self.inbound.extend(data);

        let mut actions = Vec::new();
        while self.pending.is_some() {
            let Some(wire) = self.inbound.next_frame() else {
                break;
            };
            actions.extend(self.on_frame(wire, now));
        }
        actions
    }

    fn on_frame(&mut self, wire: Bytes, now: Instant) -> Vec<OrchestratorAction> {
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };

        let frame = match Frame::decode(&wire) {
            Ok(frame) => frame,
            Err(err) => {
                let mut actions = vec![OrchestratorAction::RecordInbound { wire, frame: None }];
                actions.extend(self.fail(HandshakeError::Frame(err)));
                return actions;
            },
        };

        debug!(command = %frame.command, nonce = frame.nonce, "received frame");
        let mut actions =
            vec![OrchestratorAction::RecordInbound { wire, frame: Some(frame.clone()) }];

        if !self.nonces.validate_remote(frame.nonce) {
            actions.extend(self.fail(HandshakeError::NonceMismatch {
                expected: pending.nonce.wrapping_add(1),
                received: frame.nonce,
            }));
            return actions;
        }
        self.nonces.record_remote(frame.nonce);

        if frame.command != pending.expected {
            actions.extend(self.fail(HandshakeError::UnexpectedResponse {
                expected: pending.expected,
                received: frame.command,
            }));
            return actions;
        }

        actions.push(OrchestratorAction::Emit(HandshakeEvent::Progress(Progress::Received {
            command: frame.command,
            nonce: frame.nonce,
        })));
        actions.extend(self.advance(&frame, now));
        actions
    }

    /// Move past a step whose expected response just arrived.
    fn advance(&mut self, frame: &Frame, now: Instant) -> Vec<OrchestratorAction> {
        match self.state {
            HandshakeState::AwaitingHelloAck => {
                self.issue(Command::Dump, HandshakeState::AwaitingFirstDump, now)
            },
            HandshakeState::AwaitingFirstDump => {
                self.issue(Command::Dump, HandshakeState::AwaitingSecondDump, now)
            },
            HandshakeState::AwaitingSecondDump => {
                let code = frame.payload_text().trim().to_string();
                info!("override code obtained");
                self.override_code = Some(code.clone());

                let mut actions = vec![OrchestratorAction::Emit(HandshakeEvent::OverrideCode(code))];
                actions.extend(self.issue(Command::Stop, HandshakeState::AwaitingStopOk, now));
                actions
            },
            HandshakeState::AwaitingStopOk => self.finish(),
            state => self.fail(HandshakeError::Internal(OrchestratorError::InvalidState {
                state,
                operation: "advance",
            })),
        }
    }

    fn issue(
        &mut self,
        command: Command,
        next: HandshakeState,
        now: Instant,
    ) -> Vec<OrchestratorAction> {
        match self.send_command(command, next, now) {
            Ok(actions) => actions,
            Err(err) => self.fail(HandshakeError::Internal(err)),
        }
    }

    /// Encode `command`, start its response window and move to `next`.
    ///
    /// # Errors
    ///
    /// - `CommandInFlight` if a command is still unanswered
    /// - `InvalidState` if `next` expects no response
    /// - `Encode` if the frame cannot be encoded
    fn send_command(
        &mut self,
        command: Command,
        next: HandshakeState,
        now: Instant,
    ) -> Result<Vec<OrchestratorAction>, OrchestratorError> {
        if let Some(pending) = self.pending {
            return Err(OrchestratorError::CommandInFlight {
                pending: pending.command,
                attempted: command,
            });
        }
        let Some(expected) = next.expected_response() else {
            return Err(OrchestratorError::InvalidState { state: next, operation: "send_command" });
        };

        let nonce = self.nonces.next_local_nonce();
        let frame = Frame::empty(command, nonce);
        let wire = frame.to_wire().map_err(OrchestratorError::Encode)?;

        self.nonces.record_local_send(nonce);
        self.pending = Some(PendingCommand {
            command,
            nonce,
            expected,
            deadline: now + self.config.response_timeout,
        });
        self.state = next;
        debug!(%command, nonce, "sending command");

        Ok(vec![
            OrchestratorAction::Send { wire: Bytes::from(wire), frame },
            OrchestratorAction::Emit(HandshakeEvent::Progress(Progress::Sent { command, nonce })),
        ])
    }

    fn finish(&mut self) -> Vec<OrchestratorAction> {
        let Some(override_code) = self.override_code.clone() else {
            return self.fail(HandshakeError::Internal(OrchestratorError::InvalidState {
                state: self.state,
                operation: "finish",
            }));
        };

        self.state = HandshakeState::Done;
        self.pending = None;
        let outcome = Outcome::Completed { override_code };
        self.outcome = Some(outcome.clone());
        info!("handshake complete");

        vec![
            OrchestratorAction::Close { reason: "handshake complete".to_string() },
            OrchestratorAction::Emit(HandshakeEvent::Finished(outcome)),
        ]
    }

    fn fail(&mut self, error: HandshakeError) -> Vec<OrchestratorAction> {
        warn!(state = ?self.state, %error, "handshake failed");

        self.state = HandshakeState::Error;
        self.pending = None;
        self.inbound.clear();
        let outcome =
            Outcome::Failed { error: error.clone(), override_code: self.override_code.clone() };
        self.outcome = Some(outcome.clone());

        vec![
            OrchestratorAction::Close { reason: error.to_string() },
            OrchestratorAction::Emit(HandshakeEvent::Finished(outcome)),
        ]
    }
}
