//! Spendwatch common types, IDs, and errors.
//!
//! This crate provides foundational types shared across sw-core modules:
//! - Campaign and run identity types
//! - Schema versioning
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{BatchResult, Error, Result};
pub use id::{CampaignId, ObservationKey, RunId};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
