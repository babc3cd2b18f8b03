//! Environment abstraction.
//!
//! Drivers read the clock and sleep through this trait so the same loop runs
//! against wall-clock time in production and virtual time under simulation.

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Source of time for a driver.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Sleep for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}
