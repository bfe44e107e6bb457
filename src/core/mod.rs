//! Core data structures: amplitudes, the partitioned state container, and
//! the error taxonomy.

pub mod amplitude;
pub mod error;
pub mod state;

pub use amplitude::{Amplitude, CompactUnitary, UnitaryMatrix};
pub use error::{report_and_abort, ErrorCode, QDistError};
pub use state::StateVector;
