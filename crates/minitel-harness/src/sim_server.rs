//! Scripted MiniTel-Lite peer.
//!
//! Plays the server side of the handshake: HELLO_ACK for HELLO, DUMP_FAILED
//! for the first DUMP, DUMP_OK carrying the override code for every later
//! DUMP, STOP_OK for STOP. Nonces are checked with the same
//! [`NonceSequencer`] the client uses, so every reply carries the client's
//! nonce plus one and a client that skips or repeats a nonce is disconnected.
//!
//! A [`PeerScript`] can inject one [`Fault`] at a chosen step and can split
//! each reply into small writes to exercise stream reassembly.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use minitel_core::NonceSequencer;
use minitel_proto::{Command, Frame, FrameBuffer, frame::LENGTH_PREFIX_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Default port the simulated server listens on.
pub const SIM_PORT: u16 = 7000;

/// Misbehavior injected at one step.
///
/// `at` counts client commands from zero: 0 is HELLO, 1 and 2 are the DUMPs,
/// 3 is STOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Behave correctly
    #[default]
    None,
    /// Reply with the correct nonce plus `skew`
    WrongNonce {
        /// Step to misbehave at
        at: usize,
        /// Added to the correct reply nonce
        skew: u32,
    },
    /// Reply with `command` instead of the expected response
    WrongResponse {
        /// Step to misbehave at
        at: usize,
        /// Command to send instead
        command: Command,
    },
    /// Reply with a frame whose digest does not match
    CorruptDigest {
        /// Step to misbehave at
        at: usize,
    },
    /// Never reply, but keep the connection open
    Silent {
        /// Step to misbehave at
        at: usize,
    },
    /// Close the connection instead of replying
    Hangup {
        /// Step to misbehave at
        at: usize,
    },
}

impl Fault {
    fn step(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::WrongNonce { at, .. }
            | Self::WrongResponse { at, .. }
            | Self::CorruptDigest { at }
            | Self::Silent { at }
            | Self::Hangup { at } => Some(at),
        }
    }
}

/// How the scripted peer behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerScript {
    /// Payload of DUMP_OK
    pub override_code: String,
    /// Injected misbehavior
    pub fault: Fault,
    /// Write each reply in chunks of this many bytes
    pub chunk_size: Option<usize>,
    /// Pause between chunks
    pub chunk_delay: Duration,
}

impl Default for PeerScript {
    fn default() -> Self {
        Self {
            override_code: "CPE1704TKS".to_string(),
            fault: Fault::None,
            chunk_size: None,
            chunk_delay: Duration::from_millis(1),
        }
    }
}

/// Scripted server shared between the simulation host and assertions.
///
/// Clones share the log of received frames.
#[derive(Debug, Clone, Default)]
pub struct SimServer {
    script: Arc<PeerScript>,
    received: Arc<Mutex<Vec<Frame>>>,
}

impl SimServer {
    /// Create a server following `script`.
    pub fn new(script: PeerScript) -> Self {
        Self { script: Arc::new(script), received: Arc::default() }
    }

    /// Script this server follows.
    pub fn script(&self) -> &PeerScript {
        &self.script
    }

    /// Frames received from clients so far, in arrival order.
    pub fn received(&self) -> Vec<Frame> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `(command, nonce)` pairs received so far.
    pub fn received_commands(&self) -> Vec<(Command, u32)> {
        self.received().iter().map(|frame| (frame.command, frame.nonce)).collect()
    }

    /// Accept connections on turmoil port `port` and serve them one at a time.
    ///
    /// Runs until the simulation ends.
    pub async fn listen(&self, port: u16) -> io::Result<()> {
        let listener = turmoil::net::TcpListener::bind(("0.0.0.0", port)).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "accepted connection");
            if let Err(err) = self.serve(stream).await {
                debug!(%peer, %err, "connection ended with error");
            }
        }
    }

    /// Serve one connection until the client closes it or the script ends it.
    pub async fn serve<S>(&self, mut stream: S) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buffer = FrameBuffer::new();
        let mut chunk = [0u8; 1024];
        let mut step = 0usize;
        let mut dumps = 0usize;
        let mut nonces = NonceSequencer::new();

        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                debug!("client closed connection");
                return Ok(());
            }
            buffer.extend(&chunk[..n]);

            while let Some(wire) = buffer.next_frame() {
                let frame = match Frame::decode(&wire) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(%err, "client sent an invalid frame, disconnecting");
                        return Ok(());
                    },
                };
                self.received.lock().unwrap_or_else(PoisonError::into_inner).push(frame.clone());

                // The client opens the count at zero
                let valid = match nonces.local_last_sent() {
                    None => frame.nonce == 0,
                    Some(_) => nonces.validate_remote(frame.nonce),
                };
                if !valid {
                    warn!(
                        expected = nonces.remote_expected().unwrap_or(0),
                        received = frame.nonce,
                        "client nonce violation"
                    );
                    return Ok(());
                }
                nonces.record_remote(frame.nonce);

                let (command, payload) = match frame.command {
                    Command::Hello => (Command::HelloAck, String::new()),
                    Command::Dump => {
                        dumps += 1;
                        if dumps == 1 {
                            (Command::DumpFailed, String::new())
                        } else {
                            (Command::DumpOk, self.script.override_code.clone())
                        }
                    },
                    Command::Stop => (Command::StopOk, String::new()),
                    other => {
                        warn!(command = %other, "client sent a non-request command, disconnecting");
                        return Ok(());
                    },
                };

                let reply_nonce = nonces.next_local_nonce();
                nonces.record_local_send(reply_nonce);
                let current = step;
                step += 1;

                let fault = self.script.fault;
                if fault.step() != Some(current) {
                    let reply = Frame::new(command, reply_nonce, payload)
                        .to_wire()
                        .map_err(io::Error::other)?;
                    self.write(&mut stream, &reply).await?;
                    continue;
                }

                debug!(?fault, step = current, "injecting fault");
                let reply = match fault {
                    Fault::Silent { .. } => continue,
                    Fault::Hangup { .. } => return Ok(()),
                    Fault::WrongNonce { skew, .. } => {
                        Frame::new(command, reply_nonce.wrapping_add(skew), payload).to_wire()
                    },
                    Fault::WrongResponse { command, .. } => {
                        Frame::new(command, reply_nonce, payload).to_wire()
                    },
                    Fault::CorruptDigest { .. } => Frame::new(command, reply_nonce, payload)
                        .to_wire()
                        .map(|wire| corrupt_digest(&wire)),
                    Fault::None => Frame::new(command, reply_nonce, payload).to_wire(),
                }
                .map_err(io::Error::other)?;
                self.write(&mut stream, &reply).await?;
            }
        }
    }

    async fn write<S>(&self, stream: &mut S, wire: &[u8]) -> io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        match self.script.chunk_size {
            Some(size) if size > 0 => {
                for piece in wire.chunks(size) {
                    stream.write_all(piece).await?;
                    stream.flush().await?;
                    tokio::time::sleep(self.script.chunk_delay).await;
                }
            },
            _ => {
                stream.write_all(wire).await?;
                stream.flush().await?;
            },
        }
        Ok(())
    }
}

/// Flip the last digest byte of an encoded frame, keeping it well-formed.
fn corrupt_digest(wire: &[u8]) -> Vec<u8> {
    let Ok(mut body) = BASE64.decode(&wire[LENGTH_PREFIX_SIZE..]) else {
        return wire.to_vec();
    };
    if let Some(last) = body.last_mut() {
        *last ^= 0xFF;
    }

    let text = BASE64.encode(body);
    let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + text.len());
    out.extend_from_slice(&(text.len() as u16).to_be_bytes());
    out.extend_from_slice(text.as_bytes());
    out
}
