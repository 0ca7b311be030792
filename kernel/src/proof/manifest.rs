//! Bundle manifest: sorted mapping of artifact filename → content digest.
//!
//! # Text form
//!
//! ```text
//! <sha256 hex>  <filename>\n
//! ```
//!
//! One line per artifact, sorted by filename (byte order), LF endings. This is
//! the `sha256sum` output format, so a bundle can be checked with stock tools.
//! [`Manifest::parse`] also accepts `<hex> *<filename>` (binary-mode marker)
//! and BSD-style `SHA256 (<filename>) = <hex>` lines.
//!
//! A manifest is derived from artifact bytes only; it never records paths,
//! timestamps or permissions.

use std::collections::BTreeMap;

use super::hash::ContentHash;

/// Error parsing manifest text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestParseError {
    /// A non-empty line did not match any accepted form.
    #[error("manifest line {line} is malformed: {content}")]
    MalformedLine { line: usize, content: String },
    /// The same filename appears twice.
    #[error("manifest lists {name} more than once")]
    DuplicateEntry { name: String },
    /// The filename is empty or contains a path separator.
    #[error("manifest entry has invalid filename: {name:?}")]
    InvalidName { name: String },
    /// No entries at all.
    #[error("manifest is empty")]
    Empty,
}

/// One difference between two manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestDifference {
    /// Both list `name`, with different digests.
    DigestDiffers {
        name: String,
        left: String,
        right: String,
    },
    /// Only the right-hand manifest lists `name`.
    MissingInLeft { name: String },
    /// Only the left-hand manifest lists `name`.
    MissingInRight { name: String },
}

impl ManifestDifference {
    /// The filename this difference concerns.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::DigestDiffers { name, .. }
            | Self::MissingInLeft { name }
            | Self::MissingInRight { name } => name,
        }
    }
}

impl std::fmt::Display for ManifestDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DigestDiffers { name, left, right } => {
                write!(f, "{name}: digest differs (left={left}, right={right})")
            }
            Self::MissingInLeft { name } => write!(f, "{name}: absent from left manifest"),
            Self::MissingInRight { name } => write!(f, "{name}: absent from right manifest"),
        }
    }
}

/// Sorted filename → digest mapping for one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, ContentHash>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the digest of `name`, replacing any earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, digest: ContentHash) {
        self.entries.insert(name.into(), digest);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContentHash> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in filename order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentHash)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the canonical `sha256sum` text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (name, digest) in &self.entries {
            out.push_str(digest.hex_digest());
            out.push_str("  ");
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    /// Parse manifest text in any accepted form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestParseError`] on malformed lines, duplicate or
    /// invalid filenames, or when no entry is present.
    pub fn parse(text: &str) -> Result<Self, ManifestParseError> {
        let mut manifest = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (name, digest) =
                parse_line(line).ok_or_else(|| ManifestParseError::MalformedLine {
                    line: idx + 1,
                    content: line.to_string(),
                })?;
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                return Err(ManifestParseError::InvalidName { name });
            }
            if manifest.contains(&name) {
                return Err(ManifestParseError::DuplicateEntry { name });
            }
            manifest.insert(name, digest);
        }
        if manifest.is_empty() {
            return Err(ManifestParseError::Empty);
        }
        Ok(manifest)
    }

    /// All differences between `self` (left) and `other` (right), in filename order.
    ///
    /// Empty iff the manifests are equal.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<ManifestDifference> {
        let mut out = Vec::new();
        for (name, left) in &self.entries {
            match other.entries.get(name) {
                None => out.push(ManifestDifference::MissingInRight { name: name.clone() }),
                Some(right) if right != left => out.push(ManifestDifference::DigestDiffers {
                    name: name.clone(),
                    left: left.hex_digest().to_string(),
                    right: right.hex_digest().to_string(),
                }),
                Some(_) => {}
            }
        }
        for name in other.entries.keys() {
            if !self.entries.contains_key(name) {
                out.push(ManifestDifference::MissingInLeft { name: name.clone() });
            }
        }
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

fn parse_line(line: &str) -> Option<(String, ContentHash)> {
    // BSD form: SHA256 (name) = hex
    if let Some(rest) = line
        .strip_prefix("SHA256 (")
        .or_else(|| line.strip_prefix("SHA-256 ("))
    {
        let (name, hex_part) = rest.split_once(") =")?;
        let digest = ContentHash::from_sha256_hex(hex_part.trim())?;
        return Some((name.to_string(), digest));
    }

    // GNU form: hex  name  |  hex *name
    let (hex_part, name) = line.split_once(char::is_whitespace)?;
    let digest = ContentHash::from_sha256_hex(hex_part)?;
    let name = name.trim_start();
    let name = name.strip_prefix('*').unwrap_or(name);
    Some((name.to_string(), digest))
}
