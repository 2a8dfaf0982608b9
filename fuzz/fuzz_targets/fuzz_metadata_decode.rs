//! Fuzz target for the checkpoint metadata codec.
//!
//! Any JSON document must decode or fail with `MetadataError`; it must
//! never panic.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_metadata_decode -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use pipeaudit_reconciliation::CheckpointMetadata;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    if let Ok(payload) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = CheckpointMetadata::decode(&payload);
    }
});
