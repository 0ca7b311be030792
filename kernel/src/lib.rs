//! SBM Kernel: the deterministic core of the structural bundle monitor.
//!
//! # API Surface
//!
//! - [`params::RunSpec::validate`] -- resolve declared parameters into [`params::RunParams`]
//! - [`structural::engine::StructuralStateEngine`] -- fold magnitudes into structural states
//! - [`alphabet::AlphabetAssigner::assign`] -- classify one state into a symbol of Σ
//! - [`metrics::MetricsAccumulator`] -- aggregate metrics over the symbol stream
//! - [`proof::manifest::Manifest`] -- sorted filename → digest mapping
//!
//! # Module Dependency Direction
//!
//! `operators` ← `structural` ← `alphabet` ← `metrics` ← `params`, with `proof`
//! standing alone.
//!
//! The kernel performs no I/O. Filesystem concerns live in the harness.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alphabet;
pub mod error;
pub mod metrics;
pub mod operators;
pub mod params;
pub mod proof;
pub mod structural;
