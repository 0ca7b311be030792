//! `ArtifactWriter`: canonical serialization of one run into a bundle directory.
//!
//! # Directory layout
//!
//! ```text
//! <out>/
//!   sbm_results.csv       t,m,a,s,symbol (one row per tick)
//!   sbm_alphabet.txt      one symbol per line
//!   sbm_metrics.csv       metric,value
//!   sbm_profile.json      canonical JSON + LF
//!   sbm_manifest.sha256   written afterwards by the manifest hasher
//! ```
//!
//! The per-tick files are streamed to `.tmp_<name>` while the fold runs and
//! renamed into place by [`ArtifactWriter::finish`]; the small files go
//! through [`write_atomic`]. A bundle therefore never exposes a partially
//! written artifact under its final name. All output is ASCII with LF line
//! endings and contains no paths, timestamps, or host details.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sbm_kernel::alphabet::Symbol;
use sbm_kernel::error::ConfigError;
use sbm_kernel::metrics::MetricsAccumulator;
use sbm_kernel::structural::engine::StructuralState;

use crate::error::RunError;

pub const RESULTS_FILE: &str = "sbm_results.csv";
pub const ALPHABET_FILE: &str = "sbm_alphabet.txt";
pub const METRICS_FILE: &str = "sbm_metrics.csv";
pub const PROFILE_FILE: &str = "sbm_profile.json";
pub const MANIFEST_FILE: &str = "sbm_manifest.sha256";

/// Artifact files covered by the manifest, sorted by name.
pub const ARTIFACT_FILES: [&str; 4] = [ALPHABET_FILE, METRICS_FILE, PROFILE_FILE, RESULTS_FILE];

pub const RESULTS_HEADER: &str = "t,m,a,s,symbol";

const TEMP_PREFIX: &str = ".tmp_";

fn temp_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{TEMP_PREFIX}{name}"))
}

/// Write bytes to a path via temp file + rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp = temp_path(dir, &name);
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, path)
}

/// The output directory must be absent or empty. Creates it when absent.
fn prepare_output_dir(dir: &Path) -> Result<(), RunError> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(ConfigError::OutputNotUsable {
                    detail: format!("{} is not empty", dir.display()),
                }
                .into());
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::fs::create_dir_all(dir)
            .map_err(|e| RunError::io(format_args!("create {}", dir.display()), &e)),
        Err(e) => Err(ConfigError::OutputNotUsable {
            detail: format!("{}: {e}", dir.display()),
        }
        .into()),
    }
}

/// One streamed artifact.
#[derive(Debug)]
struct StreamedFile {
    name: &'static str,
    writer: BufWriter<File>,
}

impl StreamedFile {
    fn create(dir: &Path, name: &'static str) -> Result<Self, RunError> {
        let path = temp_path(dir, name);
        let file =
            File::create(&path).map_err(|e| RunError::io(format_args!("create {name}"), &e))?;
        Ok(Self {
            name,
            writer: BufWriter::new(file),
        })
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> Result<(), RunError> {
        self.writer
            .write_fmt(args)
            .and_then(|()| self.writer.write_all(b"\n"))
            .map_err(|e| RunError::io(format_args!("write {}", self.name), &e))
    }

    fn finalize(self, dir: &Path) -> Result<(), RunError> {
        let name = self.name;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| RunError::io(format_args!("flush {name}"), e.error()))?;
        file.sync_all()
            .map_err(|e| RunError::io(format_args!("sync {name}"), &e))?;
        std::fs::rename(temp_path(dir, name), dir.join(name))
            .map_err(|e| RunError::io(format_args!("rename {name}"), &e))
    }
}

/// Streams one run's artifacts into its exclusively owned output directory.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    results: StreamedFile,
    alphabet: StreamedFile,
    records: u64,
}

impl ArtifactWriter {
    /// Claim `dir` for a fresh bundle and open the streamed files.
    ///
    /// # Errors
    ///
    /// [`ConfigError::OutputNotUsable`] if `dir` is non-empty or unreadable;
    /// [`RunError::Io`] if files cannot be created.
    pub fn create(dir: &Path) -> Result<Self, RunError> {
        prepare_output_dir(dir)?;
        let mut results = StreamedFile::create(dir, RESULTS_FILE)?;
        results.line(format_args!("{RESULTS_HEADER}"))?;
        let alphabet = StreamedFile::create(dir, ALPHABET_FILE)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            results,
            alphabet,
            records: 0,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Records written so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Append one tick. Callers supply ticks in strictly increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] on write failure.
    pub fn write_record(
        &mut self,
        state: &StructuralState,
        symbol: Symbol,
    ) -> Result<(), RunError> {
        self.results.line(format_args!(
            "{},{},{},{},{symbol}",
            state.t, state.m, state.a, state.s
        ))?;
        self.alphabet.line(format_args!("{symbol}"))?;
        self.records += 1;
        Ok(())
    }

    /// Finalize the streamed files and write metrics and profile.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] on flush, rename, or write failure.
    pub fn finish(self, metrics: &MetricsAccumulator, profile: &[u8]) -> Result<(), RunError> {
        let dir = self.dir;
        self.results.finalize(&dir)?;
        self.alphabet.finalize(&dir)?;
        for (name, bytes) in [
            (METRICS_FILE, metrics.to_csv().into_bytes()),
            (PROFILE_FILE, profile.to_vec()),
        ] {
            write_atomic(&dir.join(name), &bytes)
                .map_err(|e| RunError::io(format_args!("write {name}"), &e))?;
        }
        Ok(())
    }
}
