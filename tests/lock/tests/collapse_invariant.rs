//! Collapse invariant and alphabet closure over serialized bundles.
//!
//! The magnitude column must equal the operator's raw output, the symbol
//! stream must stay inside Σ, and changing `H` must change output
//! reproducibly.

use lock_tests::bundle_test_helpers::run_into;
use sbm_harness::artifacts::{ALPHABET_FILE, METRICS_FILE, RESULTS_FILE};
use sbm_kernel::alphabet::Symbol;
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::operators::OperatorParams;
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::AlignmentRule;

fn metric(dir: &std::path::Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(METRICS_FILE))
        .unwrap()
        .lines()
        .find_map(|l| {
            l.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix(','))
                .map(str::to_string)
        })
        .unwrap()
}

#[test]
fn serialized_magnitude_is_raw_operator_output() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = default_registry();
    for op_id in registry.ids() {
        let dir = tmp.path().join(op_id);
        let spec = RunSpec::new(op_id, 1_500, 6, AlignmentRule::ParityBalance);
        run_into(&spec, &dir);

        let op = registry.build(op_id, &OperatorParams::new()).unwrap();
        let text = std::fs::read_to_string(dir.join(RESULTS_FILE)).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("t,m,a,s,symbol"));
        let mut count = 0;
        for (line, expected) in lines.zip(op.magnitudes()) {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 5);
            let t: u64 = fields[0].parse().unwrap();
            let m: u64 = fields[1].parse().unwrap();
            assert_eq!(m, expected, "{op_id} t={t}");
            assert_eq!(op.magnitude_at(t), Some(m), "{op_id} t={t}");
            count += 1;
        }
        assert_eq!(count, 1_500);
    }
}

#[test]
fn symbols_stay_inside_the_declared_alphabet() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = RunSpec::new("xorshift_parity", 20_000, 18, AlignmentRule::RiseFall);
    run_into(&spec, tmp.path());

    let alphabet = std::fs::read_to_string(tmp.path().join(ALPHABET_FILE)).unwrap();
    let mut seen = std::collections::BTreeSet::new();
    for code in alphabet.lines() {
        seen.insert(Symbol::parse(code).unwrap());
    }
    assert!(seen.len() <= Symbol::ALL.len());
    assert_eq!(metric(tmp.path(), "distinct_symbols"), seen.len().to_string());
    assert_eq!(metric(tmp.path(), "alphabet_size"), "6");

    // The alphabet file is exactly the symbol column of the results file.
    let results = std::fs::read_to_string(tmp.path().join(RESULTS_FILE)).unwrap();
    let column: Vec<&str> = results
        .lines()
        .skip(1)
        .map(|l| l.rsplit(',').next().unwrap())
        .collect();
    assert_eq!(column, alphabet.lines().collect::<Vec<_>>());
}

#[test]
fn changing_h_changes_output_reproducibly() {
    let tmp = tempfile::tempdir().unwrap();
    let alphabet_for = |h: usize, tag: &str| {
        let dir = tmp.path().join(format!("h{h}_{tag}"));
        let spec = RunSpec::new("digitsum_mod9", 1_000, h, AlignmentRule::ParityBalance);
        run_into(&spec, &dir);
        std::fs::read(dir.join(ALPHABET_FILE)).unwrap()
    };
    let h5 = alphabet_for(5, "a");
    let h7 = alphabet_for(7, "a");
    assert_ne!(h5, h7);
    assert_eq!(h7, alphabet_for(7, "b"));
    assert_eq!(h5, alphabet_for(5, "b"));
}

#[test]
fn profile_echoes_every_declared_parameter() {
    let tmp = tempfile::tempdir().unwrap();
    let mut spec = RunSpec::new("lcg_xor_parity", 300, 9, AlignmentRule::AnchorCompare);
    spec.posture_policy = "wrap".into();
    spec.posture_bound = 12;
    spec.align_band = 1;
    spec.posture_band = 3;
    spec.params.insert("seed".into(), 77_u64.into());
    run_into(&spec, tmp.path());

    let bytes = std::fs::read(tmp.path().join("sbm_profile.json")).unwrap();
    assert_eq!(bytes.last(), Some(&b'\n'));
    let profile: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(profile["operator"]["id"], "lcg_xor_parity");
    assert_eq!(profile["operator"]["params"]["seed"], 77);
    assert_eq!(profile["operator"]["params"]["a"], 1_664_525);
    assert_eq!(profile["n"], 300);
    assert_eq!(profile["h"], 9);
    assert_eq!(profile["alignment"], "anchor_compare");
    assert_eq!(profile["posture"]["policy"], "wrap");
    assert_eq!(profile["posture"]["bound"], 12);
    assert_eq!(profile["thresholds"]["align_band"], 1);
    assert_eq!(profile["thresholds"]["posture_band"], 3);
    assert_eq!(profile["alphabet"]["version"], "sbm.alphabet.v1");
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains(' '), "canonical profile is compact");
}
