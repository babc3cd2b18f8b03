//! Stream reassembly.
//!
//! A byte stream gives no message boundaries: one read may carry half a frame,
//! or a frame and the start of the next. [`FrameBuffer`] sits between the
//! transport and [`Frame::decode`](crate::Frame::decode) and hands out one
//! complete length-prefixed frame at a time.

use bytes::{Bytes, BytesMut};

use crate::frame::Frame;

/// Accumulates inbound bytes and splits off complete wire frames.
///
/// The buffer never inspects the frame body; a complete frame that fails to
/// decode is still returned so the caller can report it.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Split off the next complete wire frame, prefix included.
    ///
    /// Returns `None` while the buffered bytes do not yet cover a whole frame.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let len = Frame::wire_len(&self.buf)?;
        if self.buf.len() < len {
            return None;
        }
        Some(self.buf.split_to(len).freeze())
    }

    /// Bytes held that do not yet form a complete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::Command;

    fn wire(command: Command, nonce: u32, payload: &str) -> Vec<u8> {
        Frame::new(command, nonce, payload.to_owned()).to_wire().unwrap()
    }

    #[test]
    fn waits_for_prefix() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(&[0x00]);
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.pending(), 1);
    }

    #[test]
    fn waits_for_body() {
        let frame = wire(Command::HelloAck, 1, "");
        let mut buffer = FrameBuffer::new();

        buffer.extend(&frame[..10]);
        assert!(buffer.next_frame().is_none());

        buffer.extend(&frame[10..]);
        assert_eq!(buffer.next_frame().as_deref(), Some(frame.as_slice()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn splits_coalesced_frames() {
        let first = wire(Command::HelloAck, 1, "");
        let second = wire(Command::DumpFailed, 3, "denied");

        let mut buffer = FrameBuffer::new();
        buffer.extend(&[first.clone(), second.clone()].concat());

        assert_eq!(buffer.next_frame().as_deref(), Some(first.as_slice()));
        assert_eq!(buffer.next_frame().as_deref(), Some(second.as_slice()));
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn returns_undecodable_frames() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(&[0x00, 0x02, b'!', b'!']);

        let raw = buffer.next_frame().unwrap();
        assert!(Frame::decode(&raw).is_err());
    }

    #[test]
    fn clear_drops_partial_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(&[0x00, 0x40, b'A']);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    proptest! {
        #[test]
        fn any_chunking_yields_same_frames(
            payloads in prop::collection::vec("[a-zA-Z0-9 ]{0,40}", 1..6),
            chunk in 1usize..32,
        ) {
            let frames: Vec<Frame> = payloads
                .iter()
                .enumerate()
                .map(|(i, p)| Frame::new(Command::DumpOk, i as u32, p.clone()))
                .collect();
            let stream: Vec<u8> =
                frames.iter().flat_map(|f| f.to_wire().unwrap()).collect();

            let mut buffer = FrameBuffer::new();
            let mut decoded = Vec::new();
            for piece in stream.chunks(chunk) {
                buffer.extend(piece);
                while let Some(raw) = buffer.next_frame() {
                    decoded.push(Frame::decode(&raw).unwrap());
                }
            }

            prop_assert_eq!(decoded, frames);
            prop_assert!(buffer.is_empty());
        }
    }
}
