//! Mathematical utilities: weighted least squares, fit statistics and
//! uncertainty propagation.

pub mod ols;
pub mod propagation;
pub mod stats;

pub use ols::*;
pub use propagation::*;
pub use stats::*;
