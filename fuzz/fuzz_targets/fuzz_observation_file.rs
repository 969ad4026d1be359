//! Fuzz target for observation file decoding and the join downstream.
//!
//! Decodes the tagged observation array format and, when it parses,
//! pushes the rows through the forecast join and classifier the way a
//! detection run would. None of it may panic on hostile input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sw_config::{MissingForecastPolicy, ThresholdSet};
use sw_core::classify::classify;
use sw_core::join::join_observations;
use sw_core::model::ObservationRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(records) = serde_json::from_slice::<Vec<ObservationRecord>>(data) else {
        return;
    };

    let mut performance = Vec::new();
    let mut forecasts = Vec::new();
    for record in records {
        match record {
            ObservationRecord::Performance(p) => performance.push(p),
            ObservationRecord::Forecast(f) => forecasts.push(f),
            ObservationRecord::Daily(_) => {}
        }
    }

    let thresholds = ThresholdSet::default();
    for policy in [MissingForecastPolicy::ZeroFill, MissingForecastPolicy::Exclude] {
        let (pairs, report) = join_observations(&performance, &forecasts, policy);
        assert_eq!(report.classified_rows(), pairs.len());
        for pair in pairs {
            let _ = classify(
                pair.campaign_id,
                pair.timestamp,
                pair.actual_spend,
                pair.forecast_spend,
                &thresholds,
            );
        }
    }
});
