//! Fuzz target for Envelope::decode
//!
//! The feed accepts frames straight off the wire, so the decoder must hold
//! up against arbitrary bytes: no panics, no crashes, only `Err` for
//! anything that is not a valid envelope.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spotter_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    // Only valid UTF-8 reaches the decoder in production (text frames), but
    // decoding must never panic either way.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Envelope::decode(text);
    }
});
