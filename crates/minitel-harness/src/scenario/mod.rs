//! Scenario testing with mandatory oracles.
//!
//! A scenario runs the real client driver against a scripted peer inside a
//! turmoil simulation, then hands the resulting [`World`] to an oracle. The
//! oracle is mandatory: [`Scenario`] has no `run`, only
//! [`RunnableScenario`] does, and the only way to get one is
//! [`Scenario::oracle`].
//!
//! ```ignore
//! Scenario::new("happy path")
//!     .oracle(all_of(vec![completed_with("CPE1704TKS"), single_terminal_event()]))
//!     .run()?;
//! ```

mod builder;
mod world;

pub use builder::{RunnableScenario, Scenario};
use minitel_core::{HandshakeError, Outcome};
use minitel_proto::Command;
pub use world::World;

/// Verifies the final [`World`] of a scenario.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

/// The attempt completed with exactly `code`.
pub fn completed_with(code: impl Into<String>) -> OracleFn {
    let code = code.into();
    Box::new(move |world| match world.outcome() {
        Outcome::Completed { override_code } if *override_code == code => Ok(()),
        other => Err(format!("expected completion with {code:?}, got {other:?}")),
    })
}

/// The attempt failed with an error matching `predicate`.
pub fn failed_with(
    description: &'static str,
    predicate: impl Fn(&HandshakeError) -> bool + 'static,
) -> OracleFn {
    Box::new(move |world| match world.outcome().error() {
        Some(error) if predicate(error) => Ok(()),
        _ => Err(format!("expected failure ({description}), got {:?}", world.outcome())),
    })
}

/// The outcome carries `code`, or no code at all for `None`.
pub fn override_code_is(code: Option<&'static str>) -> OracleFn {
    Box::new(move |world| {
        if world.outcome().override_code() == code {
            Ok(())
        } else {
            Err(format!(
                "expected override code {code:?}, got {:?}",
                world.outcome().override_code()
            ))
        }
    })
}

/// The server received exactly these `(command, nonce)` pairs, in order.
pub fn server_received(expected: Vec<(Command, u32)>) -> OracleFn {
    Box::new(move |world| {
        if world.server_received() == expected.as_slice() {
            Ok(())
        } else {
            Err(format!(
                "server received {:?}, expected {expected:?}",
                world.server_received()
            ))
        }
    })
}

/// Exactly one terminal event was emitted, and it was the last one.
pub fn single_terminal_event() -> OracleFn {
    Box::new(|world| {
        let terminal = world.events().iter().filter(|event| event.is_terminal()).count();
        if terminal != 1 {
            return Err(format!("expected one terminal event, got {terminal}"));
        }
        match world.events().last() {
            Some(event) if event.is_terminal() => Ok(()),
            _ => Err("terminal event was not the last event".to_string()),
        }
    })
}

/// Every oracle passes. Reports the first failure.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| oracles.iter().try_for_each(|oracle| oracle(world)))
}
