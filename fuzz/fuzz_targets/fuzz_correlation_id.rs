//! Fuzz target for correlation id parsing.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_correlation_id -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use pipeaudit_core::{CorrelationId, MAX_CORRELATION_ID_LEN};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(id) = CorrelationId::parse(s) {
        assert!(!id.as_str().is_empty());
        assert!(id.as_str().len() <= MAX_CORRELATION_ID_LEN);
        assert_eq!(id.as_str(), id.as_str().trim());

        // Normalized ids parse to themselves.
        let again = CorrelationId::parse(id.as_str()).unwrap();
        assert_eq!(id, again);
    }
});
