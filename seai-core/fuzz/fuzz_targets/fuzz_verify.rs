#![no_main]

//! Fuzz target for SealEngine::verify()
//!
//! Feeds arbitrary bytes as an uploaded image. Verification must return a
//! verdict or an UnsupportedFormat error, never panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_verify

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use seai_core::{MasterSecret, SealConfig, SealEngine};

fn engine() -> &'static SealEngine {
    static ENGINE: OnceLock<SealEngine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let secret = MasterSecret::new("Fuzzing-Master-Key-0123456789-ABCDEFGH").unwrap();
        SealEngine::new(SealConfig::default(), secret).unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    let _ = engine().verify(data);
});
