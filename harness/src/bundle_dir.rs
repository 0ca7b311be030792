//! Manifest hashing and bundle self-verification.
//!
//! The manifest hasher digests every artifact file by streaming its bytes
//! through SHA-256 and writes `sbm_manifest.sha256` in `sha256sum` form,
//! sorted by filename. It never reads file metadata. The directory path is
//! never part of any hash surface.
//!
//! # Fail-closed semantics
//!
//! - Required artifact file absent → `MissingArtifact`, before any hashing
//! - Manifest absent → `MissingArtifact`
//! - Manifest unparsable, empty, or lacking a required entry → `ManifestMalformed`
//! - Manifest bytes differ from the canonical rendering of the parsed entries
//!   → `ManifestMalformed`
//! - Recomputed digest differs from the manifest → `HashMismatch`

use std::fs::File;
use std::path::Path;

use tracing::debug;

use sbm_kernel::proof::hash::{ContentHash, ContentHasher};
use sbm_kernel::proof::manifest::Manifest;

use crate::artifacts::{write_atomic, ARTIFACT_FILES, MANIFEST_FILE};
use crate::error::{RunError, VerifyError};

/// Stream one file through SHA-256.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = ContentHasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finish())
}

/// Digest `names` inside `dir`.
///
/// # Errors
///
/// [`VerifyError::MissingArtifact`] for an absent file, [`VerifyError::Io`]
/// for any other read failure.
pub fn hash_artifacts<'a>(
    dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Manifest, VerifyError> {
    let mut manifest = Manifest::new();
    for name in names {
        let digest = hash_file(&dir.join(name)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VerifyError::MissingArtifact {
                    name: name.to_string(),
                }
            } else {
                VerifyError::io(format_args!("hash {name}"), &e)
            }
        })?;
        debug!(artifact = name, digest = digest.hex_digest(), "hashed artifact");
        manifest.insert(name, digest);
    }
    Ok(manifest)
}

/// Hash the four artifact files of a finished bundle and write its manifest.
///
/// # Errors
///
/// Returns [`RunError::Io`] if an artifact cannot be read or the manifest
/// cannot be written.
pub fn write_manifest(dir: &Path) -> Result<Manifest, RunError> {
    let manifest = hash_artifacts(dir, ARTIFACT_FILES).map_err(|e| RunError::Io {
        detail: e.to_string(),
    })?;
    write_atomic(&dir.join(MANIFEST_FILE), manifest.to_text().as_bytes())
        .map_err(|e| RunError::io(format_args!("write {MANIFEST_FILE}"), &e))?;
    Ok(manifest)
}

/// Read and parse a bundle's manifest. Returns the parsed form and raw bytes.
///
/// # Errors
///
/// [`VerifyError::MissingArtifact`] if the manifest is absent,
/// [`VerifyError::ManifestMalformed`] if it does not parse.
pub fn read_manifest(dir: &Path) -> Result<(Manifest, Vec<u8>), VerifyError> {
    let bytes = std::fs::read(dir.join(MANIFEST_FILE)).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VerifyError::MissingArtifact {
                name: MANIFEST_FILE.to_string(),
            }
        } else {
            VerifyError::io(format_args!("read {MANIFEST_FILE}"), &e)
        }
    })?;
    let text = std::str::from_utf8(&bytes).map_err(|e| VerifyError::ManifestMalformed {
        detail: format!("not UTF-8: {e}"),
    })?;
    let manifest = Manifest::parse(text).map_err(|e| VerifyError::ManifestMalformed {
        detail: e.to_string(),
    })?;
    Ok((manifest, bytes))
}

/// Self-check a bundle directory against its own manifest.
///
/// Returns the verified manifest.
///
/// # Errors
///
/// Returns the first [`VerifyError`] found, in the order listed in the
/// module documentation.
pub fn verify_bundle_dir(dir: &Path) -> Result<Manifest, VerifyError> {
    for name in ARTIFACT_FILES {
        if !dir.join(name).is_file() {
            return Err(VerifyError::MissingArtifact {
                name: name.to_string(),
            });
        }
    }

    let (manifest, bytes) = read_manifest(dir)?;
    if let Some(name) = ARTIFACT_FILES.iter().find(|n| !manifest.contains(n)) {
        return Err(VerifyError::ManifestMalformed {
            detail: format!("no entry for {name}"),
        });
    }
    if bytes != manifest.to_text().as_bytes() {
        return Err(VerifyError::ManifestMalformed {
            detail: "manifest bytes are not in canonical sha256sum form".into(),
        });
    }

    let recomputed = hash_artifacts(dir, manifest.iter().map(|(name, _)| name))?;
    for (name, expected) in manifest.iter() {
        if let Some(actual) = recomputed.get(name) {
            if actual != expected {
                return Err(VerifyError::HashMismatch {
                    name: name.to_string(),
                    expected: expected.hex_digest().to_string(),
                    actual: actual.hex_digest().to_string(),
                });
            }
        }
    }
    Ok(manifest)
}
