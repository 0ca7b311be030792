//! Shared helpers for sbm benchmark suites.

use sbm_kernel::alphabet::{AlphabetAssigner, Symbol};
use sbm_kernel::metrics::MetricsAccumulator;
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::params::{RunParams, RunSpec};
use sbm_kernel::structural::engine::{AlignmentRule, StructuralStateEngine};

/// Validate a workload with the default operator registry.
///
/// # Panics
///
/// Panics if the workload is invalid. Benchmark setup failures are fatal.
#[must_use]
pub fn prepare(operator: &str, n: u64, h: usize, alignment: AlignmentRule) -> RunParams {
    RunSpec::new(operator, n, h, alignment)
        .validate(&default_registry())
        .unwrap()
}

/// Run the in-memory pipeline (operator → engine → alphabet → metrics)
/// without touching the filesystem. Returns the distinct symbol count.
///
/// # Panics
///
/// Panics if the alphabet table rejects a state.
#[must_use]
pub fn fold_in_memory(params: &RunParams) -> u64 {
    let mut engine = StructuralStateEngine::new(*params.engine()).unwrap();
    let assigner = AlphabetAssigner::new(*params.thresholds());
    let mut metrics = MetricsAccumulator::new(params.n(), params.engine().horizon)
        .with_fracture(params.long_stable(), params.operator().regime_shift());
    let n = usize::try_from(params.n()).unwrap_or(usize::MAX);
    for m in params.operator().magnitudes().take(n) {
        let state = engine.push(m);
        let symbol: Symbol = assigner.assign(&state).unwrap();
        metrics.observe(state.t, symbol);
    }
    metrics.distinct()
}
