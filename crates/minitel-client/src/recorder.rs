//! Session recording.
//!
//! A recording is one JSON document per handshake attempt, listing every frame
//! that crossed the wire in order:
//!
//! ```json
//! {
//!   "session_id": "session_2026-10-19T09-15-02.113Z",
//!   "start_time": "2026-10-19T09:15:02.113Z",
//!   "end_time": null,
//!   "server_host": "127.0.0.1",
//!   "server_port": 7000,
//!   "steps": [
//!     {
//!       "step": 1,
//!       "timestamp": "2026-10-19T09:15:02.120Z",
//!       "direction": "outbound",
//!       "request": "ADRBUUFBQUFDVmU0...",
//!       "response": null,
//!       "decoded": { "cmd": "HELLO", "nonce": 0, "payload": "" },
//!       "valid": true
//!     }
//!   ]
//! }
//! ```
//!
//! The file is rewritten after every step, so a crash loses at most the step
//! in progress. Recorder I/O failures are logged and swallowed: a broken disk
//! never aborts a handshake.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use minitel_proto::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while persisting or loading a recording.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Filesystem failure
    #[error("recording I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Recording could not be (de)serialized
    #[error("recording JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Observer of every frame an attempt sends or receives.
///
/// Implementations must not fail outward: errors are handled and logged
/// internally so the protocol flow never depends on them.
pub trait SessionRecorder: Send {
    /// Begin a new recording.
    ///
    /// Returns true if a recording began. A recording already in progress is
    /// finalized first; two attempts never share one recording.
    fn start(&mut self) -> bool;

    /// Finalize the current recording. Returns false if none was active.
    fn stop(&mut self) -> bool;

    /// True while a recording is in progress.
    fn is_active(&self) -> bool;

    /// A frame is about to be written.
    fn on_outbound(&mut self, raw: &[u8], frame: &Frame);

    /// A frame was read. `frame` is `None` if it failed to decode or verify.
    fn on_inbound(&mut self, raw: &[u8], frame: Option<&Frame>);
}

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server
    Outbound,
    /// Server to client
    Inbound,
}

/// Decoded view of a recorded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Command name
    pub cmd: String,
    /// Frame nonce
    pub nonce: u32,
    /// Payload as text
    pub payload: String,
}

impl From<&Frame> for DecodedFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            cmd: frame.command.name().to_string(),
            nonce: frame.nonce,
            payload: frame.payload_text(),
        }
    }
}

/// One frame in a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position, shared across both directions
    pub step: u64,
    /// When the frame was recorded
    pub timestamp: DateTime<Utc>,
    /// Which way it travelled
    pub direction: Direction,
    /// Base64 of the outbound wire bytes
    pub request: Option<String>,
    /// Base64 of the inbound wire bytes
    pub response: Option<String>,
    /// Decoded frame, `None` when it failed to decode
    pub decoded: Option<DecodedFrame>,
    /// Whether the frame decoded and verified
    pub valid: bool,
}

impl Step {
    /// Wire bytes of this step, whichever direction it went.
    pub fn raw(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let text = self.request.as_deref().or(self.response.as_deref()).unwrap_or_default();
        BASE64.decode(text)
    }
}

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecording {
    /// Identifier derived from the start time
    pub session_id: String,
    /// When recording began
    pub start_time: DateTime<Utc>,
    /// When recording was finalized, `None` while active
    pub end_time: Option<DateTime<Utc>>,
    /// Target host
    pub server_host: String,
    /// Target port
    pub server_port: u16,
    /// Frames in the order they crossed the wire
    pub steps: Vec<Step>,
}

impl SessionRecording {
    /// Create an empty, active recording.
    pub fn new(
        session_id: impl Into<String>,
        server_host: impl Into<String>,
        server_port: u16,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            start_time,
            end_time: None,
            server_host: server_host.into(),
            server_port,
            steps: Vec::new(),
        }
    }

    /// Read a recording back from disk.
    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the recording atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn push(&mut self, direction: Direction, raw: &[u8], frame: Option<&Frame>) {
        let encoded = BASE64.encode(raw);
        let (request, response) = match direction {
            Direction::Outbound => (Some(encoded), None),
            Direction::Inbound => (None, Some(encoded)),
        };

        self.steps.push(Step {
            step: self.steps.len() as u64 + 1,
            timestamp: Utc::now(),
            direction,
            request,
            response,
            decoded: frame.map(DecodedFrame::from),
            valid: frame.is_some(),
        });
    }
}

#[derive(Debug)]
struct ActiveSession {
    recording: SessionRecording,
    path: PathBuf,
}

impl ActiveSession {
    fn persist(&self) {
        if let Err(err) = self.recording.save(&self.path) {
            warn!(path = %self.path.display(), %err, "failed to persist session recording");
        }
    }
}

/// Records each attempt as `<session_id>.json` in a directory.
#[derive(Debug)]
pub struct JsonSessionRecorder {
    dir: PathBuf,
    server_host: String,
    server_port: u16,
    active: Option<ActiveSession>,
    last_saved: Option<PathBuf>,
}

impl JsonSessionRecorder {
    /// Record sessions against `server_host:server_port` into `dir`.
    ///
    /// The directory is created on the first [`SessionRecorder::start`].
    pub fn new(dir: impl Into<PathBuf>, server_host: impl Into<String>, server_port: u16) -> Self {
        Self {
            dir: dir.into(),
            server_host: server_host.into(),
            server_port,
            active: None,
            last_saved: None,
        }
    }

    /// Recording directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Recording in progress, if any.
    pub fn recording(&self) -> Option<&SessionRecording> {
        self.active.as_ref().map(|session| &session.recording)
    }

    /// File of the most recently started session.
    pub fn last_session(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    /// Pick a session id whose file does not exist yet.
    ///
    /// Every started session is written immediately, so its file claims the id.
    fn allocate(&self, start: DateTime<Utc>) -> (String, PathBuf) {
        let base = format!("session_{}", start.format("%Y-%m-%dT%H-%M-%S%.3fZ"));
        let mut session_id = base.clone();
        let mut suffix = 1u32;
        loop {
            let path = self.dir.join(format!("{session_id}.json"));
            if !path.exists() {
                return (session_id, path);
            }
            session_id = format!("{base}_{suffix}");
            suffix += 1;
        }
    }

    fn append(&mut self, direction: Direction, raw: &[u8], frame: Option<&Frame>) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        session.recording.push(direction, raw, frame);
        session.persist();
    }
}

impl SessionRecorder for JsonSessionRecorder {
    fn start(&mut self) -> bool {
        if self.active.is_some() {
            debug!("finalizing previous recording before starting a new one");
            self.stop();
        }

        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), %err, "cannot create recording directory");
            return false;
        }

        let start = Utc::now();
        let (session_id, path) = self.allocate(start);
        let session = ActiveSession {
            recording: SessionRecording::new(
                session_id,
                self.server_host.clone(),
                self.server_port,
                start,
            ),
            path,
        };
        session.persist();
        info!(session_id = %session.recording.session_id, "session recording started");

        self.last_saved = Some(session.path.clone());
        self.active = Some(session);
        true
    }

    fn stop(&mut self) -> bool {
        let Some(mut session) = self.active.take() else {
            return false;
        };
        session.recording.end_time = Some(Utc::now());
        session.persist();
        info!(
            session_id = %session.recording.session_id,
            steps = session.recording.steps.len(),
            "session recording stopped"
        );
        true
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn on_outbound(&mut self, raw: &[u8], frame: &Frame) {
        self.append(Direction::Outbound, raw, Some(frame));
    }

    fn on_inbound(&mut self, raw: &[u8], frame: Option<&Frame>) {
        self.append(Direction::Inbound, raw, frame);
    }
}
