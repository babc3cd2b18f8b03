//! Wire format for the MiniTel-Lite protocol.
//!
//! A frame is a 2-byte big-endian length prefix followed by that many bytes of
//! Base64 text. The Base64 text wraps a binary body of command, nonce and
//! payload, sealed with a SHA-256 digest over everything before it:
//!
//! ```text
//! [2B len] base64( [1B cmd] [4B nonce BE] [payload] [32B sha256] )
//! ```
//!
//! The digest guards against corruption and casual tampering. It is not a MAC:
//! anyone can recompute it, so it proves nothing about who sent the frame.
//!
//! Decoding assumes one complete frame per call. Byte streams that split or
//! coalesce frames go through [`FrameBuffer`] first.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod command;
pub mod errors;
pub mod frame;

pub use buffer::FrameBuffer;
pub use command::Command;
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
