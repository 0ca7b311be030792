//! Capsule registry: expected bundles for registry-based verification.
//!
//! A registry is a TOML file of `[[entry]]` tables. Each entry names a
//! bundle directory (relative to the registry file), the declared run
//! identity, and the expected digest of every artifact:
//!
//! ```toml
//! [[entry]]
//! name = "phase_a"
//! bundle = "phase_a"
//! replay = "phase_a_replay"   # optional
//! operator = "digitsum_mod9"
//! n = 1000
//! h = 5
//!
//! [entry.params]
//! base = 10
//!
//! [entry.artifacts]
//! "sbm_results.csv" = "<sha256 hex>"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sbm_kernel::operators::{OperatorParams, ParamValue};
use sbm_kernel::proof::hash::ContentHash;

use crate::artifacts::{write_atomic, PROFILE_FILE};
use crate::bundle_dir::verify_bundle_dir;
use crate::error::VerifyError;

/// One expected bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryEntry {
    pub name: String,
    /// Bundle directory, relative to the registry file.
    pub bundle: PathBuf,
    /// Optional second bundle compared pairwise against `bundle`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,
    pub operator: String,
    pub n: u64,
    pub h: usize,
    #[serde(default)]
    pub params: OperatorParams,
    /// Artifact filename → bare SHA-256 hex digest.
    pub artifacts: BTreeMap<String, String>,
}

impl RegistryEntry {
    /// Expected digests, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Registry`] for a digest that is not 64 hex chars.
    pub fn expected_digests(&self) -> Result<BTreeMap<&str, ContentHash>, VerifyError> {
        self.artifacts
            .iter()
            .map(|(name, hex_digest)| {
                ContentHash::from_sha256_hex(hex_digest)
                    .map(|digest| (name.as_str(), digest))
                    .ok_or_else(|| VerifyError::Registry {
                        detail: format!(
                            "entry {}: invalid digest for {name}: {hex_digest}",
                            self.name
                        ),
                    })
            })
            .collect()
    }
}

/// The full registry file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapsuleRegistry {
    #[serde(default, rename = "entry")]
    pub entries: Vec<RegistryEntry>,
}

impl CapsuleRegistry {
    /// # Errors
    ///
    /// [`VerifyError::Registry`] if the file is unreadable, is not valid
    /// TOML, or has no entries.
    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        let text = std::fs::read_to_string(path).map_err(|e| VerifyError::Registry {
            detail: format!("read {}: {e}", path.display()),
        })?;
        let registry: Self = toml::from_str(&text).map_err(|e| VerifyError::Registry {
            detail: format!("parse {}: {e}", path.display()),
        })?;
        if registry.entries.is_empty() {
            return Err(VerifyError::Registry {
                detail: format!("{} has no entries", path.display()),
            });
        }
        Ok(registry)
    }

    /// # Errors
    ///
    /// [`VerifyError::Registry`] on serialization failure, [`VerifyError::Io`]
    /// on write failure.
    pub fn save(&self, path: &Path) -> Result<(), VerifyError> {
        let text = toml::to_string(self).map_err(|e| VerifyError::Registry {
            detail: format!("serialize: {e}"),
        })?;
        write_atomic(path, text.as_bytes())
            .map_err(|e| VerifyError::io(format_args!("write {}", path.display()), &e))
    }

    /// Resolve an entry-relative path against the registry file location.
    #[must_use]
    pub fn resolve(registry_path: &Path, relative: &Path) -> PathBuf {
        registry_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(relative)
    }
}

/// The declared run identity echoed by a bundle profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub operator: String,
    pub params: OperatorParams,
    pub n: u64,
    pub h: usize,
}

/// Read `sbm_profile.json` from a bundle.
///
/// # Errors
///
/// [`VerifyError::MissingArtifact`] if absent, [`VerifyError::ProfileMismatch`]
/// if a required field is missing or mistyped.
pub fn read_profile_identity(bundle_dir: &Path) -> Result<ProfileIdentity, VerifyError> {
    let bytes = std::fs::read(bundle_dir.join(PROFILE_FILE)).map_err(|_| {
        VerifyError::MissingArtifact {
            name: PROFILE_FILE.to_string(),
        }
    })?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| VerifyError::ProfileMismatch {
            field: "profile".into(),
            expected: "JSON object".into(),
            found: e.to_string(),
        })?;

    let missing = |field: &str| VerifyError::ProfileMismatch {
        field: field.into(),
        expected: "present".into(),
        found: "absent".into(),
    };
    let operator = value["operator"]["id"]
        .as_str()
        .ok_or_else(|| missing("operator.id"))?
        .to_string();
    let n = value["n"].as_u64().ok_or_else(|| missing("n"))?;
    let h = value["h"]
        .as_u64()
        .and_then(|h| usize::try_from(h).ok())
        .ok_or_else(|| missing("h"))?;
    let params = value["operator"]["params"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    ParamValue::deserialize(v)
                        .ok()
                        .map(|v| (k.clone(), v))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ProfileIdentity {
        operator,
        params,
        n,
        h,
    })
}

/// Derive a registry entry from a bundle that passes its self-check.
///
/// `relative` is the bundle path as it will be recorded in the registry.
///
/// # Errors
///
/// Any self-check error from [`verify_bundle_dir`], or a profile error.
pub fn capsule_entry(
    name: &str,
    bundle_dir: &Path,
    relative: &Path,
) -> Result<RegistryEntry, VerifyError> {
    let manifest = verify_bundle_dir(bundle_dir)?;
    let identity = read_profile_identity(bundle_dir)?;
    Ok(RegistryEntry {
        name: name.to_string(),
        bundle: relative.to_path_buf(),
        replay: None,
        operator: identity.operator,
        n: identity.n,
        h: identity.h,
        params: identity.params,
        artifacts: manifest
            .iter()
            .map(|(file, digest)| (file.to_string(), digest.hex_digest().to_string()))
            .collect(),
    })
}
