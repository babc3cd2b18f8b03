//! Frame type and wire encoding.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::{
    command::Command,
    errors::{ProtocolError, Result},
};

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Command byte plus big-endian nonce.
pub const HEADER_SIZE: usize = 5;

/// SHA-256 output size.
pub const DIGEST_SIZE: usize = 32;

/// Smallest decoded body: header and digest around an empty payload.
pub const MIN_BODY_SIZE: usize = HEADER_SIZE + DIGEST_SIZE;

/// Smallest input [`Frame::decode`] will look at.
pub const MIN_WIRE_SIZE: usize = LENGTH_PREFIX_SIZE + 1;

/// Largest payload whose Base64 body still fits a 16-bit length prefix.
pub const MAX_PAYLOAD_SIZE: usize = (u16::MAX as usize / 4) * 3 - MIN_BODY_SIZE;

/// A decoded, integrity-checked frame.
///
/// Frames only exist on either side of the wire: built right before they are
/// sent, or produced by [`Frame::decode`] after the digest checked out. The
/// digest itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command code
    pub command: Command,
    /// Turn-taking counter
    pub nonce: u32,
    /// Opaque payload, UTF-8 text in practice
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(command: Command, nonce: u32, payload: impl Into<Bytes>) -> Self {
        Self { command, nonce, payload: payload.into() }
    }

    /// Create a frame with no payload.
    pub fn empty(command: Command, nonce: u32) -> Self {
        Self::new(command, nonce, Bytes::new())
    }

    /// Payload as text, with invalid UTF-8 replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Append the wire representation of this frame to `dst`.
    ///
    /// # Errors
    ///
    /// `PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut body = Vec::with_capacity(MIN_BODY_SIZE + self.payload.len());
        body.push(self.command.to_u8());
        body.extend_from_slice(&self.nonce.to_be_bytes());
        body.extend_from_slice(&self.payload);
        let digest = Sha256::digest(&body);
        body.extend_from_slice(&digest);

        let text = BASE64.encode(&body);
        let text_len = u16::try_from(text.len()).map_err(|_| ProtocolError::PayloadTooLarge {
            size: self.payload.len(),
            max: MAX_PAYLOAD_SIZE,
        })?;

        dst.reserve(LENGTH_PREFIX_SIZE + text.len());
        dst.extend_from_slice(&text_len.to_be_bytes());
        dst.extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// Wire representation of this frame as a fresh buffer.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut wire = Vec::new();
        self.encode(&mut wire)?;
        Ok(wire)
    }

    /// Decode exactly one frame from the start of `wire`.
    ///
    /// Bytes past the announced length are ignored; reassembling a stream is
    /// [`crate::FrameBuffer`]'s job.
    ///
    /// # Errors
    ///
    /// - `FrameTooShort` if fewer than 3 bytes are supplied or the decoded body
    ///   is under 37 bytes
    /// - `IncompleteFrame` if the prefix announces more bytes than supplied
    /// - `InvalidBase64` if the body text does not decode
    /// - `HashMismatch` if the digest does not cover the body
    pub fn decode(wire: &[u8]) -> Result<Self> {
        if wire.len() < MIN_WIRE_SIZE {
            return Err(ProtocolError::FrameTooShort { len: wire.len() });
        }

        let expected = Self::wire_len(wire).unwrap_or(MIN_WIRE_SIZE);
        let Some(text) = wire.get(LENGTH_PREFIX_SIZE..expected) else {
            return Err(ProtocolError::IncompleteFrame { expected, available: wire.len() });
        };

        let body = BASE64.decode(text)?;
        if body.len() < MIN_BODY_SIZE {
            return Err(ProtocolError::FrameTooShort { len: body.len() });
        }

        let (signed, tag) = body.split_at(body.len() - DIGEST_SIZE);
        if Sha256::digest(signed).as_slice() != tag {
            return Err(ProtocolError::HashMismatch);
        }

        let (header, payload) = signed.split_at(HEADER_SIZE);
        let &[code, n0, n1, n2, n3] = header else {
            return Err(ProtocolError::FrameTooShort { len: body.len() });
        };

        Ok(Self {
            command: Command::from_u8(code),
            nonce: u32::from_be_bytes([n0, n1, n2, n3]),
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Total wire length (prefix included) announced by the first two bytes.
    ///
    /// `None` until the prefix itself is available.
    pub fn wire_len(wire: &[u8]) -> Option<usize> {
        match wire {
            [hi, lo, ..] => Some(LENGTH_PREFIX_SIZE + usize::from(u16::from_be_bytes([*hi, *lo]))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    /// Armour a raw binary body the way `encode` does, without recomputing the
    /// digest.
    fn armour(body: &[u8]) -> Vec<u8> {
        let text = BASE64.encode(body);
        let mut wire = (text.len() as u16).to_be_bytes().to_vec();
        wire.extend_from_slice(text.as_bytes());
        wire
    }

    fn unarmour(wire: &[u8]) -> Vec<u8> {
        BASE64.decode(&wire[LENGTH_PREFIX_SIZE..]).unwrap()
    }

    #[test]
    fn hello_wire_vector() {
        let wire = Frame::empty(Command::Hello, 0).to_wire().unwrap();

        assert_eq!(&wire[..2], &[0x00, 52]);
        assert_eq!(&wire[2..], b"AQAAAACVe4ixJzDmRuDzPTYYt336V56CMePFnHEEvnFlYRyAJw==");

        let body = unarmour(&wire);
        assert_eq!(&body[..5], &hex!("0100000000"));
        assert_eq!(
            &body[5..],
            &hex!("957b88b12730e646e0f33d3618b77dfa579e8231e3c59c7104be7165611c8027")
        );
    }

    #[test]
    fn decode_dump_ok_vector() {
        let text = b"gwAAAAVDUEUxNzA0VEtT7FqkDXWxUlcuCROWPOBcMGTbJGe9T0k7RGhp73J6H28=";
        let mut wire = vec![0x00, 64];
        wire.extend_from_slice(text);

        let frame = Frame::decode(&wire).unwrap();
        assert_eq!(frame.command, Command::DumpOk);
        assert_eq!(frame.nonce, 5);
        assert_eq!(frame.payload_text(), "CPE1704TKS");
    }

    #[test]
    fn encode_appends_to_existing_buffer() {
        let mut dst = vec![0xAA];
        Frame::empty(Command::Stop, 6).encode(&mut dst).unwrap();
        assert_eq!(dst[0], 0xAA);
        assert_eq!(Frame::decode(&dst[1..]).unwrap(), Frame::empty(Command::Stop, 6));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut wire = Frame::new(Command::DumpOk, 5, "code").to_wire().unwrap();
        wire.extend_from_slice(b"trailing garbage");
        assert_eq!(Frame::decode(&wire).unwrap().payload_text(), "code");
    }

    #[test]
    fn short_input_rejected() {
        assert_eq!(Frame::decode(&[]), Err(ProtocolError::FrameTooShort { len: 0 }));
        assert_eq!(Frame::decode(&[0x00, 0x10]), Err(ProtocolError::FrameTooShort { len: 2 }));
    }

    #[test]
    fn incomplete_frame_rejected() {
        let wire = Frame::empty(Command::Hello, 0).to_wire().unwrap();
        let cut = &wire[..wire.len() - 1];
        assert_eq!(
            Frame::decode(cut),
            Err(ProtocolError::IncompleteFrame { expected: wire.len(), available: wire.len() - 1 })
        );
    }

    #[test]
    fn short_body_rejected() {
        // 36 bytes: one short of header plus digest
        let wire = armour(&[0u8; 36]);
        assert_eq!(Frame::decode(&wire), Err(ProtocolError::FrameTooShort { len: 36 }));

        let wire = [0x00, 0x01, b'A'];
        assert!(Frame::decode(&wire).is_err());
    }

    #[test]
    fn invalid_base64_rejected() {
        let wire = [0x00, 0x04, b'!', b'!', b'!', b'!'];
        assert!(matches!(Frame::decode(&wire), Err(ProtocolError::InvalidBase64(_))));
    }

    #[test]
    fn unknown_command_decodes() {
        let frame = Frame::decode(&Frame::empty(Command::Unknown(0x42), 9).to_wire().unwrap())
            .unwrap();
        assert_eq!(frame.command, Command::Unknown(0x42));
        assert_eq!(frame.command.name(), "UNKNOWN");
    }

    #[test]
    fn largest_payload_fits() {
        let frame = Frame::new(Command::DumpOk, 1, vec![b'x'; MAX_PAYLOAD_SIZE]);
        let wire = frame.to_wire().unwrap();
        assert!(wire.len() <= LENGTH_PREFIX_SIZE + u16::MAX as usize);
        assert_eq!(Frame::decode(&wire).unwrap(), frame);
    }

    #[test]
    fn oversized_payload_rejected() {
        let frame = Frame::new(Command::DumpOk, 1, vec![b'x'; MAX_PAYLOAD_SIZE + 1]);
        assert_eq!(
            frame.to_wire(),
            Err(ProtocolError::PayloadTooLarge { size: MAX_PAYLOAD_SIZE + 1, max: MAX_PAYLOAD_SIZE })
        );
    }

    #[test]
    fn wire_len_needs_prefix() {
        assert_eq!(Frame::wire_len(&[]), None);
        assert_eq!(Frame::wire_len(&[0x01]), None);
        assert_eq!(Frame::wire_len(&[0x01, 0x00]), Some(258));
    }

    proptest! {
        #[test]
        fn roundtrip(code in any::<u8>(), nonce in any::<u32>(), payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let frame = Frame::new(Command::from_u8(code), nonce, payload);
            let wire = frame.to_wire().unwrap();
            prop_assert_eq!(Frame::decode(&wire).unwrap(), frame);
        }

        #[test]
        fn single_byte_tamper_detected(
            nonce in any::<u32>(),
            payload in prop::collection::vec(any::<u8>(), 0..64),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let wire = Frame::new(Command::DumpOk, nonce, payload).to_wire().unwrap();
            let mut body = unarmour(&wire);
            let at = index.index(body.len());
            body[at] ^= flip;

            prop_assert_eq!(Frame::decode(&armour(&body)), Err(ProtocolError::HashMismatch));
        }

        #[test]
        fn arbitrary_input_never_panics(input in prop::collection::vec(any::<u8>(), 0..128)) {
            let _ = Frame::decode(&input);
        }
    }
}
