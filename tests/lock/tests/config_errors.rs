//! Configuration errors are detected before any artifact is written.

use lock_tests::bundle_test_helpers::reference_spec;
use sbm_harness::error::RunError;
use sbm_harness::runner::run_bundle;
use sbm_kernel::error::ConfigError;
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::operators::families::LCG_XOR_PARITY;
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::{AlignmentRule, MAX_HORIZON};

fn assert_rejected(spec: &RunSpec, check: impl Fn(&ConfigError) -> bool) {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    match run_bundle(spec, &default_registry(), &out) {
        Err(RunError::Config(e)) => assert!(check(&e), "unexpected config error: {e}"),
        other => panic!("expected a config error, got {other:?}"),
    }
    assert!(!out.exists(), "no output directory for a rejected run");
}

#[test]
fn unknown_operator() {
    let mut spec = reference_spec();
    spec.operator = "no_such_operator".into();
    assert_rejected(&spec, |e| matches!(e, ConfigError::UnknownOperator { .. }));
}

#[test]
fn zero_horizon() {
    let mut spec = reference_spec();
    spec.h = 0;
    assert_rejected(&spec, |e| matches!(e, ConfigError::InvalidHorizon { h: 0 }));
}

#[test]
fn oversized_horizon() {
    let mut spec = reference_spec();
    spec.h = MAX_HORIZON + 1;
    assert_rejected(&spec, |e| {
        matches!(e, ConfigError::InvalidHorizon { h } if *h == MAX_HORIZON + 1)
    });
}

#[test]
fn rejected_horizon_leaves_output_directory_usable() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut spec = reference_spec();
    spec.h = MAX_HORIZON + 1;
    assert!(run_bundle(&spec, &default_registry(), &out).is_err());
    assert!(!out.exists());

    run_bundle(&reference_spec(), &default_registry(), &out).unwrap();
    let debris: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tmp_"))
        .collect();
    assert!(debris.is_empty(), "leftover temp files: {debris:?}");
}

#[test]
fn empty_sequence() {
    let mut spec = reference_spec();
    spec.n = 0;
    assert_rejected(&spec, |e| matches!(e, ConfigError::EmptySequence));
}

#[test]
fn undeclared_alignment() {
    let mut spec = reference_spec();
    spec.alignment = None;
    assert_rejected(&spec, |e| matches!(e, ConfigError::UndeclaredAlignment));
}

#[test]
fn unknown_operator_parameter() {
    let mut spec = reference_spec();
    spec.params.insert("bogus".into(), 1_u64.into());
    assert_rejected(&spec, |e| matches!(e, ConfigError::UnknownParameter { .. }));
}

#[test]
fn unknown_observation_mode() {
    let mut spec = RunSpec::new(LCG_XOR_PARITY, 100, 4, AlignmentRule::ParityBalance);
    spec.params.insert("obs".into(), "hamming".into());
    assert_rejected(&spec, |e| {
        matches!(e, ConfigError::InvalidParameter { name, .. } if name == "obs")
    });
}

#[test]
fn zero_long_stable() {
    let mut spec = reference_spec();
    spec.long_stable = 0;
    assert_rejected(&spec, |e| {
        matches!(e, ConfigError::InvalidParameter { name, .. } if name == "long_stable")
    });
}

#[test]
fn unknown_posture_policy() {
    let mut spec = reference_spec();
    spec.posture_policy = "bounce".into();
    assert_rejected(&spec, |e| {
        matches!(e, ConfigError::UnknownPosturePolicy { name } if name == "bounce")
    });
}

#[test]
fn used_output_directory_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("leftover.txt"), b"x").unwrap();
    let result = run_bundle(&reference_spec(), &default_registry(), tmp.path());
    assert!(matches!(
        result,
        Err(RunError::Config(ConfigError::OutputNotUsable { .. }))
    ));
    let names: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(names.len(), 1);
}
