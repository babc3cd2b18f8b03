//! Arbitrary bytes must never panic the decoder, and anything that decodes
//! must encode back to the same wire bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use minitel_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let wire = frame.to_wire().expect("decoded frame re-encodes");
    let again = Frame::decode(&wire).expect("re-encoded frame decodes");
    assert_eq!(frame, again);
});
