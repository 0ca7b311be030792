//! Harness runner: drives the kernel fold to produce one artifact bundle.
//!
//! # Pipeline
//!
//! ```text
//! RunSpec::validate() → StructuralStateEngine::new() → ArtifactWriter::create()
//!   → [Operator tick → engine.push() → assigner.assign() → metrics + write_record] × N
//!   → ArtifactWriter::finish() → write_manifest()
//! ```
//!
//! Validation and engine construction happen before the output directory is
//! touched, so a configuration error leaves no artifacts behind. The fold is strictly
//! sequential and keeps O(H) state; records are streamed, not buffered.

use std::path::{Path, PathBuf};

use tracing::info;

use sbm_kernel::alphabet::AlphabetAssigner;
use sbm_kernel::metrics::MetricsAccumulator;
use sbm_kernel::operators::registry::OperatorRegistry;
use sbm_kernel::operators::ticks;
use sbm_kernel::params::{RunParams, RunSpec};
use sbm_kernel::proof::manifest::Manifest;
use sbm_kernel::structural::engine::StructuralStateEngine;

use crate::artifacts::ArtifactWriter;
use crate::bundle_dir::write_manifest;
use crate::error::RunError;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub out_dir: PathBuf,
    pub ticks: u64,
    pub distinct_symbols: u64,
    pub manifest: Manifest,
}

/// Validate `spec` against `registry`, then run it into `out`.
///
/// # Errors
///
/// Returns [`RunError::Config`] before any I/O for invalid parameters,
/// otherwise any error from [`run_params`].
pub fn run_bundle(
    spec: &RunSpec,
    registry: &OperatorRegistry,
    out: &Path,
) -> Result<RunSummary, RunError> {
    let params = spec.validate(registry)?;
    run_params(&params, out)
}

/// Run already-validated parameters into `out`.
///
/// # Errors
///
/// [`RunError::Config`] if `out` is not usable, [`RunError::Consistency`] if
/// a state matches no alphabet predicate, [`RunError::Io`] on write failure.
pub fn run_params(params: &RunParams, out: &Path) -> Result<RunSummary, RunError> {
    let engine_config = *params.engine();
    info!(
        operator = params.operator().id(),
        n = params.n(),
        h = engine_config.horizon,
        alignment = engine_config.alignment.as_str(),
        out = %out.display(),
        "run starting"
    );

    let mut engine = StructuralStateEngine::new(engine_config)?;
    let assigner = AlphabetAssigner::new(*params.thresholds());
    let mut metrics = MetricsAccumulator::new(params.n(), engine_config.horizon)
        .with_fracture(params.long_stable(), params.operator().regime_shift());
    let mut writer = ArtifactWriter::create(out)?;

    for tick in ticks(params.operator(), params.n()) {
        let state = engine.push(tick.m);
        let symbol = assigner.assign(&state)?;
        metrics.observe(state.t, symbol);
        writer.write_record(&state, symbol)?;
    }

    writer.finish(&metrics, &params.profile_bytes()?)?;
    let manifest = write_manifest(out)?;

    info!(
        ticks = metrics.ticks(),
        distinct = metrics.distinct(),
        out = %out.display(),
        "run finished"
    );
    Ok(RunSummary {
        out_dir: out.to_path_buf(),
        ticks: metrics.ticks(),
        distinct_symbols: metrics.distinct(),
        manifest,
    })
}
