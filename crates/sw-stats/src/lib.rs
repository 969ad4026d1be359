//! Spendwatch statistics utilities.

pub mod stats;

pub use stats::percent::*;
pub use stats::stable::*;
pub use stats::trend::*;
