//! Fault injection scenarios.
//!
//! The scripted peer misbehaves at one step; the client must stop at the first
//! violation, send nothing after it, and report exactly one terminal outcome.

use std::time::Duration;

use minitel_core::HandshakeError;
use minitel_harness::{
    Fault,
    scenario::{
        Scenario, all_of, failed_with, override_code_is, server_received, single_terminal_event,
    },
};
use minitel_proto::{Command, ProtocolError};

#[test]
fn wrong_nonce_on_hello_ack_stops_before_dump() {
    Scenario::new("nonce skew on HELLO_ACK")
        .fault(Fault::WrongNonce { at: 0, skew: 1 })
        .oracle(all_of(vec![
            failed_with("nonce mismatch", |error| {
                matches!(error, HandshakeError::NonceMismatch { expected: 1, received: 2 })
            }),
            server_received(vec![(Command::Hello, 0)]),
            override_code_is(None),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn repeated_nonce_is_rejected() {
    // Skew of u32::MAX wraps the reply back onto the client's own nonce
    Scenario::new("echoed nonce")
        .fault(Fault::WrongNonce { at: 1, skew: u32::MAX })
        .oracle(all_of(vec![
            failed_with("nonce mismatch", |error| {
                matches!(error, HandshakeError::NonceMismatch { expected: 3, received: 2 })
            }),
            server_received(vec![(Command::Hello, 0), (Command::Dump, 2)]),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn dump_ok_answering_hello_names_the_wrong_command() {
    Scenario::new("DUMP_OK on HELLO")
        .fault(Fault::WrongResponse { at: 0, command: Command::DumpOk })
        .oracle(all_of(vec![
            failed_with("unexpected response", |error| {
                matches!(
                    error,
                    HandshakeError::UnexpectedResponse {
                        expected: Command::HelloAck,
                        received: Command::DumpOk,
                    }
                ) && error.to_string().contains("DUMP_OK")
            }),
            server_received(vec![(Command::Hello, 0)]),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn out_of_order_response_fails() {
    Scenario::new("DUMP_OK on first DUMP")
        .fault(Fault::WrongResponse { at: 1, command: Command::DumpOk })
        .oracle(all_of(vec![
            failed_with("unexpected response", |error| {
                matches!(
                    error,
                    HandshakeError::UnexpectedResponse {
                        expected: Command::DumpFailed,
                        received: Command::DumpOk,
                    }
                )
            }),
            server_received(vec![(Command::Hello, 0), (Command::Dump, 2)]),
            override_code_is(None),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn unknown_command_fails() {
    Scenario::new("unknown response code")
        .fault(Fault::WrongResponse { at: 0, command: Command::Unknown(0x42) })
        .oracle(all_of(vec![
            failed_with("unexpected response", |error| {
                matches!(
                    error,
                    HandshakeError::UnexpectedResponse { received: Command::Unknown(0x42), .. }
                )
            }),
            server_received(vec![(Command::Hello, 0)]),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn corrupt_digest_fails_integrity() {
    Scenario::new("corrupt digest on DUMP_OK")
        .fault(Fault::CorruptDigest { at: 2 })
        .oracle(all_of(vec![
            failed_with("hash mismatch", |error| {
                matches!(error, HandshakeError::Frame(ProtocolError::HashMismatch))
            }),
            server_received(vec![(Command::Hello, 0), (Command::Dump, 2), (Command::Dump, 4)]),
            override_code_is(None),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn silent_peer_times_out() {
    Scenario::new("silent after HELLO")
        .fault(Fault::Silent { at: 0 })
        .response_timeout(Duration::from_secs(2))
        .oracle(all_of(vec![
            failed_with("response timeout", |error| {
                matches!(error, HandshakeError::ResponseTimeout { command: Command::Hello, .. })
            }),
            Box::new(|world| {
                if world.elapsed() >= Duration::from_secs(2) {
                    Ok(())
                } else {
                    Err(format!("timed out early after {:?}", world.elapsed()))
                }
            }),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn hangup_before_dump_ok_loses_nothing_but_the_code() {
    Scenario::new("hangup on second DUMP")
        .fault(Fault::Hangup { at: 2 })
        .oracle(all_of(vec![
            failed_with("connection closed", |error| {
                matches!(error, HandshakeError::ConnectionClosed { awaiting: Command::DumpOk })
            }),
            override_code_is(None),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn stop_failure_keeps_override_code() {
    Scenario::new("hangup on STOP")
        .fault(Fault::Hangup { at: 3 })
        .oracle(all_of(vec![
            failed_with("connection closed", |error| {
                matches!(error, HandshakeError::ConnectionClosed { awaiting: Command::StopOk })
            }),
            override_code_is(Some("CPE1704TKS")),
            Box::new(|world| {
                if world.announced_codes() == vec!["CPE1704TKS"] {
                    Ok(())
                } else {
                    Err(format!("codes announced: {:?}", world.announced_codes()))
                }
            }),
            single_terminal_event(),
        ]))
        .run()
        .expect("scenario should pass");
}
