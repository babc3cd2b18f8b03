//! Deterministic simulation harness for MiniTel-Lite client testing.
//!
//! Turmoil-based implementations of the Environment and Transport traits, a
//! scripted MiniTel-Lite peer with fault injection, and a scenario API that
//! runs the real [`minitel_client::HandshakeDriver`] against that peer in
//! simulated time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_env;
pub mod sim_server;
pub mod sim_transport;

pub use sim_env::SimEnv;
pub use sim_server::{Fault, PeerScript, SIM_PORT, SimServer};
pub use sim_transport::SimTransport;
