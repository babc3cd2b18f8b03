//! Reassembly under arbitrary input and arbitrary read boundaries.
//!
//! The first byte picks the chunk size. Whatever the split, the buffer must
//! hand out the same frames as one contiguous read, and never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use minitel_proto::{Frame, FrameBuffer};

fuzz_target!(|data: &[u8]| {
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(split).max(1);

    let mut whole = FrameBuffer::new();
    whole.extend(stream);
    let mut expected = Vec::new();
    while let Some(wire) = whole.next_frame() {
        expected.push(wire);
    }

    let mut pieces = FrameBuffer::new();
    let mut actual = Vec::new();
    for piece in stream.chunks(chunk) {
        pieces.extend(piece);
        while let Some(wire) = pieces.next_frame() {
            let _ = Frame::decode(&wire);
            actual.push(wire);
        }
    }

    assert_eq!(expected, actual);
    assert_eq!(whole.pending(), pieces.pending());
});
