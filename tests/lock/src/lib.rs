//! Shared helpers for the lock tests.

pub mod bundle_test_helpers;
pub mod fixture;
