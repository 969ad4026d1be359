//! Fuzz target for anomaly ledger line parsing.
//!
//! The ledger reader parses one JSON record per line and must skip
//! corrupt lines without panicking; this drives the same per-line
//! decode with arbitrary text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sw_core::history::AnomalyRecord;

fuzz_target!(|data: &str| {
    for line in data.lines() {
        let _ = serde_json::from_str::<AnomalyRecord>(line);
    }
});
