#![no_main]

//! Fuzz target for TagRecord::decode() and Envelope::from_bytes()
//!
//! Both parse attacker-controlled bytes recovered from pixels and must reject
//! malformed input without panicking or over-allocating.
//!
//! Run with: cargo +nightly fuzz run fuzz_tag_decode

use libfuzzer_sys::fuzz_target;
use seai_core::{Envelope, TagRecord};

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = TagRecord::decode(data) {
        // Key order may differ, length may not
        assert_eq!(record.encode().len(), data.len());
        assert_eq!(record.encoded_len(), data.len());
        let _ = record.validate(u64::MAX / 2);
    }

    let _ = Envelope::from_bytes(data);
});
