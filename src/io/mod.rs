//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - trace exports (CSV) (`export`)
//! - measured-variable tables for error propagation (`measurements`)
//! - result JSON read/write (`result`)

pub mod export;
pub mod ingest;
pub mod measurements;
pub mod result;

pub use export::*;
pub use ingest::*;
pub use measurements::*;
pub use result::*;
