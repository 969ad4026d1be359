//! Fuzz target for thresholds.json parsing and validation.
//!
//! Tests that threshold configuration handles arbitrary input without
//! panicking: decode either fails cleanly or yields a set that the
//! semantic validator accepts or rejects, never a crash.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sw_config::validate::validate_thresholds;
use sw_config::ThresholdSet;

fuzz_target!(|data: &[u8]| {
    if let Ok(thresholds) = serde_json::from_slice::<ThresholdSet>(data) {
        let _ = validate_thresholds(&thresholds);
    }
});
