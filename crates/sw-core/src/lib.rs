//! Spendwatch Core Library
//!
//! This library provides the core functionality for ad spend anomaly
//! detection:
//! - Deviation classification against forecast thresholds
//! - Forecast/actual joining with configurable missing-forecast handling
//! - Aggregation and dashboard statistics
//! - Anomaly history persistence (JSONL ledger)
//! - Alert escalation ladders
//!
//! The binary entry point is in `main.rs`.

pub mod aggregate;
pub mod classify;
pub mod escalation;
pub mod exit_codes;
pub mod history;
pub mod join;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod schema;
pub mod source;
pub mod synth;
