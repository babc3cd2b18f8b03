//! Wall-clock environment.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use minitel_core::Environment;

/// Production environment backed by the system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
