//! Reporting utilities: uncertainty rounding and formatted terminal output.

pub mod format;
pub mod uncertainty;

pub use format::*;
pub use uncertainty::*;
