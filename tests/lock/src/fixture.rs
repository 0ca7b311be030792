//! Workloads and the per-workload record printed by the `replay_fixture`
//! binary.
//!
//! Each record is one canonical JSON line: the declared identity of the
//! workload (operator parameters as supplied), the digest of every
//! artifact, and the distinct-symbol count. Records carry no paths, so two
//! processes agree byte for byte exactly when their bundles do.

use serde_json::{json, Value};

use sbm_harness::runner::RunSummary;
use sbm_kernel::operators::families::{
    COLLATZ_PARITY, DIGITSUM_MOD9, LCG_XOR_PARITY, SHA1_PARITY, SSNT_CLOSURE, XORSHIFT_PARITY,
};
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::AlignmentRule;

/// Every registered operator once, plus a regime-shifted LCG.
#[must_use]
pub fn workloads() -> Vec<RunSpec> {
    let mut shifted = RunSpec::new(LCG_XOR_PARITY, 4_000, 6, AlignmentRule::ParityBalance);
    shifted.long_stable = 200;
    shifted.params.insert("shift_n".into(), 2_000_u64.into());
    shifted.params.insert("post_mode".into(), "ramp".into());
    shifted.params.insert("obs".into(), "delta_parity".into());

    let mut bucketed = RunSpec::new(SSNT_CLOSURE, 3_000, 4, AlignmentRule::AnchorCompare);
    bucketed.params.insert("buckets".into(), 8_u64.into());

    vec![
        RunSpec::new(DIGITSUM_MOD9, 1_000, 5, AlignmentRule::ParityBalance),
        RunSpec::new(XORSHIFT_PARITY, 5_000, 18, AlignmentRule::RiseFall),
        RunSpec::new(COLLATZ_PARITY, 1_500, 3, AlignmentRule::AnchorCompare),
        RunSpec::new(LCG_XOR_PARITY, 2_000, 9, AlignmentRule::AnchorCompare),
        RunSpec::new(SHA1_PARITY, 2_500, 7, AlignmentRule::RiseFall),
        bucketed,
        shifted,
    ]
}

/// The record for one finished workload.
#[must_use]
pub fn record(spec: &RunSpec, summary: &RunSummary) -> Value {
    let artifacts: serde_json::Map<String, Value> = summary
        .manifest
        .iter()
        .map(|(name, digest)| (name.to_string(), Value::from(digest.hex_digest())))
        .collect();
    json!({
        "operator": spec.operator,
        "params": spec.params,
        "n": spec.n,
        "h": spec.h,
        "alignment": spec.alignment,
        "long_stable": spec.long_stable,
        "ticks": summary.ticks,
        "distinct_symbols": summary.distinct_symbols,
        "artifacts": artifacts,
    })
}
