//! `ReplayVerifier`: exact byte/digest comparison of bundles.
//!
//! Two modes:
//!
//! - **Pairwise**: both bundles self-check, then their manifests must agree
//!   entry by entry and byte for byte.
//! - **Registry**: every registry entry's bundle self-checks, its digests
//!   equal the recorded ones, and its profile echoes the recorded operator,
//!   `n`, and `h`. An entry with a `replay` path is also compared pairwise.
//!
//! There is no tolerance in either mode. Results are collected into a
//! [`VerifyReport`] whose text form is stable and line-oriented.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifacts::MANIFEST_FILE;
use crate::bundle_dir::{read_manifest, verify_bundle_dir};
use crate::error::VerifyError;
use crate::registry::{read_profile_identity, CapsuleRegistry, RegistryEntry};

/// Process exit codes of the verifier surface.
pub const EXIT_PASS: i32 = 0;
pub const EXIT_FAIL: i32 = 1;
pub const EXIT_INPUT_MISSING: i32 = 2;
pub const EXIT_REPORT_WRITE_FAILED: i32 = 3;

/// Compare two bundles that must be byte-identical.
///
/// # Errors
///
/// Any self-check error of either bundle, or [`VerifyError::ReplayMismatch`]
/// naming the first differing file.
pub fn verify_pair(primary: &Path, replay: &Path) -> Result<(), VerifyError> {
    let left = verify_bundle_dir(primary)?;
    let right = verify_bundle_dir(replay)?;

    if let Some(first) = left.diff(&right).into_iter().next() {
        return Err(VerifyError::ReplayMismatch {
            name: first.name().to_string(),
            detail: first.to_string(),
        });
    }

    let (_, left_bytes) = read_manifest(primary)?;
    let (_, right_bytes) = read_manifest(replay)?;
    if left_bytes != right_bytes {
        return Err(VerifyError::ReplayMismatch {
            name: MANIFEST_FILE.to_string(),
            detail: "manifest bytes differ".into(),
        });
    }
    Ok(())
}

/// Check one registry entry. Returns every problem found, empty on pass.
#[must_use]
pub fn verify_entry(registry_path: &Path, entry: &RegistryEntry) -> Vec<VerifyError> {
    let bundle = CapsuleRegistry::resolve(registry_path, &entry.bundle);
    let manifest = match verify_bundle_dir(&bundle) {
        Ok(manifest) => manifest,
        Err(e) => return vec![e],
    };

    let mut errors = Vec::new();
    match entry.expected_digests() {
        Ok(expected) => {
            for (name, digest) in &expected {
                match manifest.get(name) {
                    None => errors.push(VerifyError::MissingArtifact {
                        name: (*name).to_string(),
                    }),
                    Some(actual) if actual != digest => errors.push(VerifyError::HashMismatch {
                        name: (*name).to_string(),
                        expected: digest.hex_digest().to_string(),
                        actual: actual.hex_digest().to_string(),
                    }),
                    Some(_) => {}
                }
            }
            for (name, _) in manifest.iter() {
                if !expected.contains_key(name) {
                    errors.push(VerifyError::Registry {
                        detail: format!("entry {}: {name} is not registered", entry.name),
                    });
                }
            }
        }
        Err(e) => errors.push(e),
    }

    match read_profile_identity(&bundle) {
        Ok(identity) => {
            let checks = [
                ("operator", entry.operator.clone(), identity.operator),
                ("n", entry.n.to_string(), identity.n.to_string()),
                ("h", entry.h.to_string(), identity.h.to_string()),
            ];
            for (field, expected, found) in checks {
                if expected != found {
                    errors.push(VerifyError::ProfileMismatch {
                        field: field.into(),
                        expected,
                        found,
                    });
                }
            }
        }
        Err(e) => errors.push(e),
    }

    if let Some(replay) = &entry.replay {
        let replay = CapsuleRegistry::resolve(registry_path, replay);
        if let Err(e) = verify_pair(&bundle, &replay) {
            errors.push(e);
        }
    }
    errors
}

/// Verification mode, as printed in the report header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    Bundle,
    Pairwise,
    Registry,
}

impl VerifyMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bundle => "BUNDLE",
            Self::Pairwise => "PAIRWISE",
            Self::Registry => "REGISTRY",
        }
    }
}

/// Verdict for one bundle (or pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleVerdict {
    pub folder: String,
    pub errors: Vec<VerifyError>,
}

impl BundleVerdict {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregate verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub mode: VerifyMode,
    pub verdicts: Vec<BundleVerdict>,
    /// Errors not tied to a single bundle (e.g., unreadable registry).
    pub global_errors: Vec<VerifyError>,
}

impl VerifyReport {
    fn new(mode: VerifyMode) -> Self {
        Self {
            mode,
            verdicts: Vec::new(),
            global_errors: Vec::new(),
        }
    }

    /// Self-check a single bundle.
    #[must_use]
    pub fn bundle(dir: &Path) -> Self {
        let mut report = Self::new(VerifyMode::Bundle);
        report.push(dir, verify_bundle_dir(dir).err().into_iter().collect());
        report
    }

    /// Compare `primary` and `replay`.
    #[must_use]
    pub fn pairwise(primary: &Path, replay: &Path) -> Self {
        let mut report = Self::new(VerifyMode::Pairwise);
        report.push(
            primary,
            verify_pair(primary, replay).err().into_iter().collect(),
        );
        report
    }

    /// Check every entry of the registry at `registry_path`.
    #[must_use]
    pub fn registry(registry_path: &Path) -> Self {
        let mut report = Self::new(VerifyMode::Registry);
        match CapsuleRegistry::load(registry_path) {
            Ok(registry) => {
                for entry in &registry.entries {
                    let bundle = CapsuleRegistry::resolve(registry_path, &entry.bundle);
                    report.push(&bundle, verify_entry(registry_path, entry));
                }
            }
            Err(e) => report.global_errors.push(e),
        }
        report
    }

    fn push(&mut self, folder: &Path, errors: Vec<VerifyError>) {
        let verdict = BundleVerdict {
            folder: folder.display().to_string(),
            errors,
        };
        if verdict.passed() {
            info!(folder = %verdict.folder, mode = self.mode.as_str(), "bundle verified");
        } else {
            warn!(
                folder = %verdict.folder,
                mode = self.mode.as_str(),
                errors = verdict.errors.len(),
                "bundle failed verification"
            );
        }
        self.verdicts.push(verdict);
    }

    /// Pass iff at least one bundle was checked and nothing failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.global_errors.is_empty()
            && !self.verdicts.is_empty()
            && self.verdicts.iter().all(BundleVerdict::passed)
    }

    /// First error in report order, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&VerifyError> {
        self.global_errors
            .iter()
            .chain(self.verdicts.iter().flat_map(|v| v.errors.iter()))
            .next()
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            EXIT_PASS
        } else {
            EXIT_FAIL
        }
    }

    /// Stable text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SBM CONFORMANCE VERIFIER");
        let _ = writeln!(out, "MODE: {}", self.mode.as_str());
        for e in &self.global_errors {
            let _ = writeln!(out, "ERROR: {e}");
        }
        for verdict in &self.verdicts {
            let _ = writeln!(out, "FOLDER: {}", verdict.folder);
            let _ = writeln!(out, "STATUS: {}", pass_fail(verdict.passed()));
            for e in &verdict.errors {
                let _ = writeln!(out, "ERROR: {e}");
            }
        }
        let _ = writeln!(out, "OVERALL_STATUS: {}", pass_fail(self.passed()));
        out
    }

    /// Write [`VerifyReport::render`] to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Io`] on write failure.
    pub fn write_to(&self, path: &Path) -> Result<(), VerifyError> {
        std::fs::write(path, self.render())
            .map_err(|e| VerifyError::io(format_args!("write {}", path.display()), &e))
    }
}

pub(crate) fn pass_fail(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Inputs that must exist before verification starts. Returns the first
/// missing path, which maps to [`EXIT_INPUT_MISSING`].
#[must_use]
pub fn first_missing<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    paths
        .into_iter()
        .find(|p| !p.exists())
        .map(Path::to_path_buf)
}
