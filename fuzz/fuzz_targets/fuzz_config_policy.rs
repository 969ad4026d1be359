//! Fuzz target for policy.json parsing and validation.
//!
//! Tests that JSON policy configuration parsing handles arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sw_config::validate::validate_policy;
use sw_config::DetectionPolicy;

fuzz_target!(|data: &[u8]| {
    // Try to parse as JSON - should never panic, only return an error
    if let Ok(policy) = serde_json::from_slice::<DetectionPolicy>(data) {
        let _ = validate_policy(&policy);
    }
});
