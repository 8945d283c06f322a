//! Fitting engine.
//!
//! Responsibilities:
//!
//! - validate and dispatch a fit request (`engine`)
//! - weighted curve fits for the linearizable models (`fitter`)
//! - amplitude spectra of uniformly sampled series (`spectrum`)

pub mod engine;
pub mod fitter;
pub mod spectrum;

pub use engine::*;
pub use fitter::*;
pub use spectrum::*;
