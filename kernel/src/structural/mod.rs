//! Structural state: the trailing window and the sequential fold over it.
//!
//! Depends on `error` only; consumes magnitudes, not operators.

pub mod engine;
pub mod window;
