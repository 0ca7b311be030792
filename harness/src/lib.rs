//! SBM Harness: filesystem and orchestration around the kernel.
//!
//! The harness runs the kernel fold into an artifact bundle
//! (`RunSpec::validate` → fold → `ArtifactWriter` → manifest), verifies
//! bundles pairwise or against a capsule registry, and sequences the
//! three conformance phases.
//!
//! The harness does NOT implement structural logic; it delegates to the
//! kernel. It owns I/O, logging, and phase isolation.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod artifacts;
pub mod bundle_dir;
pub mod error;
pub mod phases;
pub mod registry;
pub mod runner;
pub mod verify;
