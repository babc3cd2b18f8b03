//! Simulated environment.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use minitel_core::Environment;

/// Environment backed by tokio's clock.
///
/// Inside a turmoil simulation the tokio clock is virtual, so response
/// deadlines elapse in simulated time and timeout tests finish instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a simulated environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
