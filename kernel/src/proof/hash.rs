//! Content hashing for bundle artifacts.
//!
//! Algorithm: SHA-256 over raw artifact bytes, no domain prefix, so that a
//! manifest can be checked with stock `sha256sum -c`.
//!
//! **Exactly one place defines artifact hashing.** The harness hashes files by
//! streaming them through [`ContentHasher`]; everything else calls [`sha256`].

use sha2::{Digest, Sha256};

/// Algorithm tag carried by every [`ContentHash`].
pub const ALGORITHM_SHA256: &str = "sha256";

/// Length of a SHA-256 hex digest.
pub const SHA256_HEX_LEN: usize = 64;

/// A content-addressed hash with algorithm identifier.
///
/// Format: `"algorithm:hex_digest"` (e.g., `"sha256:abcdef..."`)
///
/// Invariant: the inner string always contains exactly one `:` separator,
/// with non-empty substrings on both sides (enforced by [`ContentHash::parse`]).
/// Hex digests are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    /// Full string in `"algorithm:hex_digest"` format.
    full: String,
    /// Byte offset of the `:` separator (cached from parse).
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` format.
    ///
    /// Returns `None` if the format is invalid (missing colon,
    /// empty algorithm, or empty digest).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 {
            return None;
        }
        Some(Self {
            full: format!("{}:{}", &s[..colon], s[colon + 1..].to_ascii_lowercase()),
            colon,
        })
    }

    /// Build a SHA-256 hash from a bare hex digest (as found in a manifest line).
    ///
    /// Returns `None` unless `hex_digest` is exactly 64 hex characters.
    #[must_use]
    pub fn from_sha256_hex(hex_digest: &str) -> Option<Self> {
        if hex_digest.len() != SHA256_HEX_LEN
            || !hex_digest.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        Self::parse(&format!("{ALGORITHM_SHA256}:{hex_digest}"))
    }

    /// The algorithm portion (e.g., "sha256").
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    /// The hex digest portion.
    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    /// The full string representation (`"algorithm:hex_digest"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// SHA-256 of a byte slice.
#[must_use]
pub fn sha256(data: &[u8]) -> ContentHash {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Incremental SHA-256 over a byte stream.
///
/// Implements [`std::io::Write`] so a file can be hashed with `io::copy`
/// without buffering it whole.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consume the hasher and produce the digest.
    #[must_use]
    pub fn finish(self) -> ContentHash {
        let hex_digest = hex::encode(self.inner.finalize());
        let colon = ALGORITHM_SHA256.len();
        ContentHash {
            full: format!("{ALGORITHM_SHA256}:{hex_digest}"),
            colon,
        }
    }
}

impl std::io::Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
