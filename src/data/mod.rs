//! Data sources other than CSV files.

pub mod synth;

pub use synth::*;
