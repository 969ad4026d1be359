//! Core statistics modules.

pub mod percent;
pub mod stable;
pub mod trend;
