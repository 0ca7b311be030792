//! Harness error kinds.
//!
//! [`RunError`] covers producing a bundle; [`VerifyError`] covers checking
//! one. Both carry `detail` strings instead of `io::Error` so they stay
//! `Clone + Eq` and can be collected into reports.

use sbm_kernel::error::{ConfigError, ConsistencyError};
use sbm_kernel::proof::canon::CanonError;

/// Error producing an artifact bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("internal consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("canonical JSON error: {0}")]
    Canon(#[from] CanonError),
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

impl RunError {
    pub(crate) fn io(context: impl std::fmt::Display, err: &std::io::Error) -> Self {
        Self::Io {
            detail: format!("{context}: {err}"),
        }
    }
}

/// Error verifying an artifact bundle or registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// A required artifact file is absent.
    #[error("missing artifact: {name}")]
    MissingArtifact { name: String },
    /// A recomputed digest differs from the recorded one.
    #[error("hash mismatch for {name}: expected {expected}, recomputed {actual}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    /// Two bundles that must be identical are not.
    #[error("replay mismatch at {name}: {detail}")]
    ReplayMismatch { name: String, detail: String },
    /// The manifest file cannot be used.
    #[error("malformed manifest: {detail}")]
    ManifestMalformed { detail: String },
    /// The bundle profile does not echo what the registry expects.
    #[error("profile mismatch on {field}: expected {expected}, found {found}")]
    ProfileMismatch {
        field: String,
        expected: String,
        found: String,
    },
    /// The registry file is unreadable or invalid.
    #[error("registry error: {detail}")]
    Registry { detail: String },
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

impl VerifyError {
    pub(crate) fn io(context: impl std::fmt::Display, err: &std::io::Error) -> Self {
        Self::Io {
            detail: format!("{context}: {err}"),
        }
    }
}
