//! Domain types used throughout the engine and pipeline.
//!
//! This module defines:
//!
//! - model selection enums (`ModelKind`, `ModelSpec`)
//! - validated observation input (`Observation`, `ObservationSet`)
//! - fit outputs (`FitResult`, `Trace`, etc.)
//! - run configuration (`RunConfig`, `FitOptions`, `ColumnMap`)
//! - error-propagation inputs and outputs (`MeasuredVariable`, `Propagation`)

pub mod types;

pub use types::*;
