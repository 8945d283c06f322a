//! Curve model implementations.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over the three linearizable families.

pub mod model;

pub use model::*;
