//! End-to-end handshake scenarios against a well-behaved peer.
//!
//! Each scenario runs the production driver over turmoil's simulated TCP and
//! checks both sides: the client's outcome and events, and the exact frames
//! the peer received.

use minitel_core::{HandshakeEvent, Progress};
use minitel_harness::scenario::{
    Scenario, all_of, completed_with, server_received, single_terminal_event,
};
use minitel_proto::Command;

const FULL_EXCHANGE: [(Command, u32); 4] =
    [(Command::Hello, 0), (Command::Dump, 2), (Command::Dump, 4), (Command::Stop, 6)];

#[test]
fn happy_path_returns_override_code() {
    Scenario::new("happy path")
        .oracle(all_of(vec![
            completed_with("CPE1704TKS"),
            server_received(FULL_EXCHANGE.to_vec()),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn override_code_is_trimmed() {
    Scenario::new("padded code")
        .override_code("  JOSHUA\r\n")
        .oracle(completed_with("JOSHUA"))
        .run()
        .expect("scenario should pass");
}

#[test]
fn events_follow_the_exchange() {
    Scenario::new("event order")
        .oracle(Box::new(|world| {
            let progress: Vec<String> = world
                .events()
                .iter()
                .filter_map(|event| match event {
                    HandshakeEvent::Progress(progress) => Some(progress.to_string()),
                    _ => None,
                })
                .collect();

            let expected = [
                "connecting",
                "connected",
                "sent HELLO (nonce 0)",
                "received HELLO_ACK (nonce 1)",
                "sent DUMP (nonce 2)",
                "received DUMP_FAILED (nonce 3)",
                "sent DUMP (nonce 4)",
                "received DUMP_OK (nonce 5)",
                "sent STOP (nonce 6)",
                "received STOP_OK (nonce 7)",
            ];
            if progress != expected {
                return Err(format!("unexpected progress: {progress:?}"));
            }
            if world.announced_codes() != vec!["CPE1704TKS"] {
                return Err(format!("unexpected codes: {:?}", world.announced_codes()));
            }
            Ok(())
        }))
        .run()
        .expect("scenario should pass");
}

#[test]
fn code_is_announced_before_stop() {
    Scenario::new("code before stop")
        .oracle(Box::new(|world| {
            let code_at = world
                .events()
                .iter()
                .position(|event| matches!(event, HandshakeEvent::OverrideCode(_)));
            let stop_at = world.events().iter().position(|event| {
                matches!(
                    event,
                    HandshakeEvent::Progress(Progress::Sent { command: Command::Stop, .. })
                )
            });

            match (code_at, stop_at) {
                (Some(code), Some(stop)) if code < stop => Ok(()),
                other => Err(format!("code/stop positions: {other:?}")),
            }
        }))
        .run()
        .expect("scenario should pass");
}

#[test]
fn chunked_replies_are_reassembled() {
    Scenario::new("three-byte writes")
        .chunked(3)
        .oracle(all_of(vec![
            completed_with("CPE1704TKS"),
            server_received(FULL_EXCHANGE.to_vec()),
        ]))
        .run()
        .expect("scenario should pass");
}
