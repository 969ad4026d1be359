//! Fuzz target for the pure classification core.
//!
//! Classification is plain float math and must tolerate every f64 the
//! type system allows, including NaN, infinities, and unordered
//! threshold triples. It may produce a degenerate tier, never a panic.

#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use sw_config::ThresholdSet;
use sw_core::aggregate::DeviationSummary;
use sw_core::classify::classify;

#[derive(Debug, Arbitrary)]
struct ClassifyInput {
    actual: f64,
    forecast: f64,
    l1: f64,
    l2: f64,
    l3: f64,
}

fuzz_target!(|input: ClassifyInput| {
    let thresholds = ThresholdSet::new(input.l1, input.l2, input.l3);
    let ts = Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap();

    let deviation = classify("camp-001", ts, input.actual, input.forecast, &thresholds);

    let mut summary = DeviationSummary::default();
    summary.observe(&deviation);
    let _ = summary.anomaly_rate();
    let _ = summary.max_severity();
});
