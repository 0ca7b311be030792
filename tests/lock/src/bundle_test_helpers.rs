//! Shared test helpers for producing and mutating artifact bundles.
//!
//! Mutations come in two flavours: [`flip_byte`] leaves the manifest stale,
//! so self-checks report a hash mismatch; [`rewrite_row`] re-manifests the
//! bundle, so only a comparison against an independent record (a replay
//! bundle or a capsule registry) can notice.

use std::path::Path;

use sha2::{Digest, Sha256};

use sbm_harness::artifacts::{ARTIFACT_FILES, MANIFEST_FILE, RESULTS_FILE};
use sbm_harness::bundle_dir::write_manifest;
use sbm_harness::runner::{run_bundle, RunSummary};
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::AlignmentRule;

/// The reference small-scale workload: `digitsum_mod9`, N=1000, H=5.
#[must_use]
pub fn reference_spec() -> RunSpec {
    RunSpec::new("digitsum_mod9", 1_000, 5, AlignmentRule::ParityBalance)
}

/// Run `spec` into `dir` with the default operator registry.
///
/// # Panics
///
/// Panics if the run fails. Test-only.
#[must_use]
pub fn run_into(spec: &RunSpec, dir: &Path) -> RunSummary {
    run_bundle(spec, &default_registry(), dir).unwrap()
}

/// Independent SHA-256 hex digest (does not go through the kernel).
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Copy every artifact plus the manifest from `src` into a new `dst`.
///
/// # Panics
///
/// Panics on I/O failure. Test-only.
pub fn copy_bundle(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).unwrap();
    for name in ARTIFACT_FILES.iter().chain([&MANIFEST_FILE]) {
        std::fs::copy(src.join(name), dst.join(name)).unwrap();
    }
}

/// XOR one byte of `file` in place with `0x01`.
///
/// # Panics
///
/// Panics on I/O failure or if `offset` is out of range. Test-only.
pub fn flip_byte(file: &Path, offset: usize) {
    let mut bytes = std::fs::read(file).unwrap();
    bytes[offset] ^= 0x01;
    std::fs::write(file, bytes).unwrap();
}

/// Replace the record row for tick `t` in the results file, then rewrite the
/// manifest so the bundle stays self-consistent.
///
/// # Panics
///
/// Panics if the row does not exist or on I/O failure. Test-only.
pub fn rewrite_row(bundle: &Path, t: u64, replacement: &str) {
    let path = bundle.join(RESULTS_FILE);
    let text = std::fs::read_to_string(&path).unwrap();
    let prefix = format!("{t},");
    let mut found = false;
    let rewritten: String = text
        .lines()
        .map(|line| {
            if !found && line.starts_with(&prefix) {
                found = true;
                format!("{replacement}\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect();
    assert!(found, "no row for t={t}");
    std::fs::write(&path, rewritten).unwrap();
    write_manifest(bundle).unwrap();
}
