//! `labfit` library crate.
//!
//! The binary (`labfit`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is usable from other programs (report generators,
//!   notebooks, acquisition tools) without spawning processes
//! - core logic is testable in isolation
//!
//! Besides curve fitting, `math::propagation` carries measurement
//! uncertainties through a user formula to first order.
//!
//! Typical use:
//!
//! ```no_run
//! use labfit::domain::{ModelKind, ObservationSet};
//! use labfit::fit::FitEngine;
//! use labfit::report::equation_label;
//!
//! let obs = ObservationSet::from_columns(&[1.0, 2.0, 3.0], &[2.1, 3.9, 6.2], None, Some(&[0.1, 0.1, 0.1]))?;
//! let fit = FitEngine::default().fit(ModelKind::Linear, &obs)?;
//! println!("{}", equation_label(&fit));
//! # Ok::<(), labfit::error::FitError>(())
//! ```

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
