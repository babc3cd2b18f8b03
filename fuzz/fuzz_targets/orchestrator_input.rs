//! Hostile server bytes against a connected orchestrator.
//!
//! Whatever arrives, the orchestrator must not panic and must emit exactly
//! one terminal event.

#![no_main]

use std::time::{Duration, Instant};

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use minitel_core::{
    HandshakeEvent, Orchestrator, OrchestratorAction, OrchestratorConfig, TransportEvent,
};

fuzz_target!(|data: &[u8]| {
    let now = Instant::now();
    let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());

    let mut actions = orchestrator.start().expect("fresh orchestrator starts");
    actions.extend(orchestrator.handle_event(TransportEvent::Connected, now));
    for piece in data.chunks(7) {
        let event = TransportEvent::Data(Bytes::copy_from_slice(piece));
        actions.extend(orchestrator.handle_event(event, now));
    }
    actions.extend(orchestrator.tick(now + Duration::from_secs(60)));

    let terminal = actions
        .iter()
        .filter(|action| matches!(action, OrchestratorAction::Emit(HandshakeEvent::Finished(_))))
        .count();
    assert_eq!(terminal, 1, "exactly one outcome, at the latest on the timeout tick");
});
