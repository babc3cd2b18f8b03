//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use minitel_client::{ClientConfig, HandshakeDriver};
use minitel_core::{Environment, HandshakeEvent, Outcome};
use tokio::sync::mpsc;

use crate::{
    SimEnv, SimTransport,
    scenario::{OracleFn, World},
    sim_server::{Fault, PeerScript, SIM_PORT, SimServer},
};

const SERVER_HOST: &str = "server";

/// Scenario builder.
///
/// Configure the peer and the client, then call `.oracle()` to get a
/// [`RunnableScenario`].
pub struct Scenario {
    name: String,
    script: PeerScript,
    config: ClientConfig,
    duration: Duration,
}

impl Scenario {
    /// Create a new scenario with a well-behaved peer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: PeerScript::default(),
            config: ClientConfig::new(SERVER_HOST, SIM_PORT),
            duration: Duration::from_secs(60),
        }
    }

    /// Replace the peer script.
    pub fn peer(mut self, script: PeerScript) -> Self {
        self.script = script;
        self
    }

    /// Inject one fault into the peer.
    pub fn fault(mut self, fault: Fault) -> Self {
        self.script.fault = fault;
        self
    }

    /// Code the peer hands out on DUMP_OK.
    pub fn override_code(mut self, code: impl Into<String>) -> Self {
        self.script.override_code = code.into();
        self
    }

    /// Make the peer write replies in chunks of `size` bytes.
    pub fn chunked(mut self, size: usize) -> Self {
        self.script.chunk_size = Some(size);
        self
    }

    /// Client response timeout.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Simulated time budget for the whole scenario.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

type Observed = (Outcome, Vec<HandshakeEvent>, Duration);

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Starts the scripted peer on host `server`, runs one handshake attempt
    /// from host `client`, then invokes the oracle on what both sides saw.
    pub fn run(self) -> Result<(), String> {
        let Self { scenario, oracle } = self;
        let name = scenario.name;

        let server = SimServer::new(scenario.script);
        let observed: Arc<Mutex<Option<Observed>>> = Arc::default();

        let mut sim = turmoil::Builder::new().simulation_duration(scenario.duration).build();

        let host_server = server.clone();
        sim.host(SERVER_HOST, move || {
            let server = host_server.clone();
            async move {
                server.listen(SIM_PORT).await?;
                Ok(())
            }
        });

        let client_observed = Arc::clone(&observed);
        let config = scenario.config;
        sim.client("client", async move {
            let env = SimEnv::new();
            let started = env.now();
            let (tx, mut rx) = mpsc::unbounded_channel();

            let mut driver = HandshakeDriver::new(SimTransport, env, config).with_events(tx);
            let outcome = driver.run().await;
            drop(driver);

            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }

            let elapsed = env.now().saturating_duration_since(started);
            *client_observed.lock().unwrap_or_else(PoisonError::into_inner) =
                Some((outcome, events, elapsed));
            Ok(())
        });

        sim.run().map_err(|err| format!("Scenario '{name}': simulation failed: {err}"))?;

        let Some((outcome, events, elapsed)) =
            observed.lock().unwrap_or_else(PoisonError::into_inner).take()
        else {
            return Err(format!("Scenario '{name}': client never finished"));
        };

        let world = World::new(outcome, events, server.received_commands(), elapsed);
        oracle(&world).map_err(|err| format!("Scenario '{name}': {err}"))
    }
}
