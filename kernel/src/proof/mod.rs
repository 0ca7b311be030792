//! Proof module: canonical serialization, content hashing, manifests.
//!
//! Depends on nothing else in the kernel.

pub mod canon;
pub mod hash;
pub mod manifest;
