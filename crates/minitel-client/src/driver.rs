//! Async driver for the handshake orchestrator.
//!
//! The driver owns the only I/O of an attempt. It executes the orchestrator's
//! actions in order and turns everything the outside world does (connect
//! results, bytes read, end of stream, deadlines passing) into transport
//! events or ticks.
//!
//! ```text
//! loop {
//!     execute queued actions   (may feed events back immediately)
//!     if outcome reached: stop
//!     select {
//!         stream.read()    -> TransportEvent
//!         sleep(deadline)  -> tick(now)
//!     }
//! }
//! ```

use std::collections::VecDeque;

use bytes::Bytes;
use minitel_core::{
    Environment, HandshakeEvent, HandshakeState, Orchestrator, OrchestratorAction, Outcome,
    Progress, Transport, TransportEvent,
};
use minitel_proto::Frame;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, trace, warn};

use crate::{config::ClientConfig, recorder::SessionRecorder};

/// Runs one handshake attempt over a transport.
///
/// A driver is single-use: a second [`run`](Self::run) fails with
/// `InvalidState` because the orchestrator has already left `Idle`.
pub struct HandshakeDriver<T: Transport, E: Environment> {
    transport: T,
    env: E,
    config: ClientConfig,
    orchestrator: Orchestrator,
    stream: Option<T::Stream>,
    recorder: Option<Box<dyn SessionRecorder>>,
    events: Option<UnboundedSender<HandshakeEvent>>,
}

impl<T: Transport, E: Environment> HandshakeDriver<T, E> {
    /// Create a driver for `config.host:config.port`.
    pub fn new(transport: T, env: E, config: ClientConfig) -> Self {
        let orchestrator = Orchestrator::new(config.orchestrator_config());
        Self {
            transport,
            env,
            config,
            orchestrator,
            stream: None,
            recorder: None,
            events: None,
        }
    }

    /// Record every frame of the attempt.
    #[must_use]
    pub fn with_recorder(mut self, recorder: impl SessionRecorder + 'static) -> Self {
        self.recorder = Some(Box::new(recorder));
        self
    }

    /// Forward every [`HandshakeEvent`] to `events`.
    ///
    /// The channel sees progress in order and exactly one `Finished`.
    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<HandshakeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Current orchestrator state.
    pub fn state(&self) -> HandshakeState {
        self.orchestrator.state()
    }

    /// Attached recorder, if any.
    pub fn recorder(&self) -> Option<&dyn SessionRecorder> {
        self.recorder.as_deref()
    }

    /// Run the attempt to its terminal outcome.
    ///
    /// Never panics on peer misbehavior; every failure is reported through
    /// the returned [`Outcome`]. The transport is closed and the recording
    /// finalized before this returns.
    pub async fn run(&mut self) -> Outcome {
        let actions = match self.orchestrator.start() {
            Ok(actions) => actions,
            Err(err) => {
                warn!(%err, "handshake could not start");
                let outcome = Outcome::Failed { error: err.into(), override_code: None };
                self.emit(HandshakeEvent::Finished(outcome.clone()));
                return outcome;
            },
        };

        // Only attempts that actually start get a session file
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.start();
        }

        let outcome = self.drive(actions.into()).await;

        self.close("attempt finished").await;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.stop();
        }

        outcome
    }

    async fn drive(&mut self, mut queue: VecDeque<OrchestratorAction>) -> Outcome {
        loop {
            while let Some(action) = queue.pop_front() {
                self.execute(action, &mut queue).await;
            }

            if let Some(outcome) = self.orchestrator.outcome() {
                return outcome.clone();
            }

            let actions = match self.wait().await {
                Some(event) => self.orchestrator.handle_event(event, self.env.now()),
                None => self.orchestrator.tick(self.env.now()),
            };
            queue.extend(actions);
        }
    }

    /// Wait for the next read or for the response deadline.
    ///
    /// Returns `None` when the deadline wait ended first.
    async fn wait(&mut self) -> Option<TransportEvent> {
        let Some(stream) = self.stream.as_mut() else {
            return Some(TransportEvent::Closed);
        };

        let now = self.env.now();
        let timeout = self
            .orchestrator
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));
        let env = self.env.clone();
        let deadline = async move {
            match timeout {
                Some(timeout) => env.sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let mut buf = vec![0u8; self.config.read_buffer_size];
        tokio::select! {
            result = stream.read(&mut buf) => Some(match result {
                Ok(0) => TransportEvent::Closed,
                Ok(n) => {
                    trace!(bytes = n, "read from transport");
                    TransportEvent::Data(Bytes::copy_from_slice(&buf[..n]))
                },
                Err(err) => TransportEvent::Failed { reason: err.to_string() },
            }),
            () = deadline => None,
        }
    }

    /// Execute one action, queueing whatever the orchestrator answers.
    async fn execute(
        &mut self,
        action: OrchestratorAction,
        queue: &mut VecDeque<OrchestratorAction>,
    ) {
        match action {
            OrchestratorAction::OpenTransport => {
                let event = self.open().await;
                queue.extend(self.orchestrator.handle_event(event, self.env.now()));
            },
            OrchestratorAction::Send { wire, frame } => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.on_outbound(&wire, &frame);
                }
                if let Err(err) = self.write(&wire).await {
                    // The frame never reached the peer, so neither does its progress event
                    queue.retain(|queued| !is_sent_event(queued, &frame));
                    let event = TransportEvent::Failed { reason: err.to_string() };
                    queue.extend(self.orchestrator.handle_event(event, self.env.now()));
                }
            },
            OrchestratorAction::RecordInbound { wire, frame } => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.on_inbound(&wire, frame.as_ref());
                }
            },
            OrchestratorAction::Emit(event) => self.emit(event),
            OrchestratorAction::Close { reason } => self.close(&reason).await,
        }
    }

    async fn open(&mut self) -> TransportEvent {
        let host = self.config.host.as_str();
        let port = self.config.port;
        debug!(host, port, "opening transport");

        let result = tokio::select! {
            result = self.transport.connect(host, port) => Some(result),
            () = self.env.sleep(self.config.connect_timeout) => None,
        };

        match result {
            Some(Ok(stream)) => {
                self.stream = Some(stream);
                TransportEvent::Connected
            },
            Some(Err(err)) => TransportEvent::Failed { reason: err.to_string() },
            None => TransportEvent::TimedOut,
        }
    }

    async fn write(&mut self, wire: &[u8]) -> std::io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(std::io::ErrorKind::NotConnected.into());
        };
        stream.write_all(wire).await?;
        stream.flush().await
    }

    async fn close(&mut self, reason: &str) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        debug!(reason, "closing transport");
        if let Err(err) = stream.shutdown().await {
            trace!(%err, "transport shutdown failed");
        }
    }

    fn emit(&self, event: HandshakeEvent) {
        match &event {
            HandshakeEvent::Progress(progress) => debug!("{progress}"),
            HandshakeEvent::OverrideCode(code) => info!(code = %code, "override code received"),
            HandshakeEvent::Finished(Outcome::Completed { .. }) => info!("handshake completed"),
            HandshakeEvent::Finished(Outcome::Failed { error, override_code }) => {
                warn!(%error, has_code = override_code.is_some(), "handshake failed");
            },
        }

        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            trace!("event receiver dropped");
        }
    }
}

/// Whether `action` reports `frame` as sent.
fn is_sent_event(action: &OrchestratorAction, frame: &Frame) -> bool {
    matches!(
        action,
        OrchestratorAction::Emit(HandshakeEvent::Progress(Progress::Sent { command, nonce }))
            if *command == frame.command && *nonce == frame.nonce
    )
}
