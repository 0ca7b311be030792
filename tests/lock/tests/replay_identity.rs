//! Replay identity: two independent runs with identical declared parameters
//! produce byte-identical bundles, and the reference scenario's corruption
//! is caught by registry verification.

use std::path::Path;

use lock_tests::bundle_test_helpers::{copy_bundle, reference_spec, rewrite_row, run_into};
use sbm_harness::artifacts::{ARTIFACT_FILES, MANIFEST_FILE, RESULTS_FILE};
use sbm_harness::bundle_dir::verify_bundle_dir;
use sbm_harness::error::VerifyError;
use sbm_harness::registry::{capsule_entry, CapsuleRegistry};
use sbm_harness::verify::{verify_pair, VerifyReport, EXIT_PASS};
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::AlignmentRule;

fn read(dir: &Path, name: &str) -> Vec<u8> {
    std::fs::read(dir.join(name)).unwrap()
}

#[test]
fn every_operator_and_rule_replays_byte_identically() {
    let tmp = tempfile::tempdir().unwrap();
    let operators: Vec<&str> = default_registry().ids().collect();
    for (i, op) in operators.iter().enumerate() {
        for rule in AlignmentRule::ALL {
            for h in [1, 4, 17] {
                let spec = RunSpec::new(op, 600, h, *rule);
                let a = tmp.path().join(format!("{i}_{}_{h}_a", rule.as_str()));
                let b = tmp.path().join(format!("{i}_{}_{h}_b", rule.as_str()));
                let ma = run_into(&spec, &a).manifest;
                let mb = run_into(&spec, &b).manifest;
                assert_eq!(ma, mb, "{op} {} h={h}", rule.as_str());
                for name in ARTIFACT_FILES.iter().chain([&MANIFEST_FILE]) {
                    assert_eq!(read(&a, name), read(&b, name), "{op} {name}");
                }
                verify_pair(&a, &b).unwrap();
            }
        }
    }
}

#[test]
fn reference_scenario_manifests_match_and_corruption_is_hash_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let m1_dir = tmp.path().join("m1");
    let m2_dir = tmp.path().join("m2");
    run_into(&reference_spec(), &m1_dir);
    run_into(&reference_spec(), &m2_dir);
    assert_eq!(read(&m1_dir, MANIFEST_FILE), read(&m2_dir, MANIFEST_FILE));

    // Record M1 in a capsule registry.
    let registry_path = tmp.path().join("registry.toml");
    let entry = capsule_entry("m1", &m1_dir, Path::new("m1_copy")).unwrap();
    CapsuleRegistry {
        entries: vec![entry],
    }
    .save(&registry_path)
    .unwrap();

    // A clean copy passes.
    let copy = tmp.path().join("m1_copy");
    copy_bundle(&m1_dir, &copy);
    assert_eq!(VerifyReport::registry(&registry_path).exit_code(), EXIT_PASS);

    // Corrupt one row of the copy and recompute its digest.
    rewrite_row(&copy, 500, "500,0,0,0,Q");
    verify_bundle_dir(&copy).unwrap();

    let report = VerifyReport::registry(&registry_path);
    assert_ne!(report.exit_code(), EXIT_PASS);
    assert!(matches!(
        report.first_error(),
        Some(VerifyError::HashMismatch { name, .. }) if name == RESULTS_FILE
    ));

    // Pairwise against the untouched replay also fails.
    assert!(matches!(
        verify_pair(&m2_dir, &copy),
        Err(VerifyError::ReplayMismatch { ref name, .. }) if name == RESULTS_FILE
    ));
}

#[test]
fn registry_entry_with_replay_is_compared_pairwise() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = RunSpec::new("xorshift_parity", 3_000, 18, AlignmentRule::RiseFall);
    run_into(&spec, &tmp.path().join("p"));
    run_into(&spec, &tmp.path().join("r"));

    let mut entry = capsule_entry("p", &tmp.path().join("p"), Path::new("p")).unwrap();
    entry.replay = Some("r".into());
    let registry_path = tmp.path().join("registry.toml");
    CapsuleRegistry {
        entries: vec![entry],
    }
    .save(&registry_path)
    .unwrap();
    assert!(VerifyReport::registry(&registry_path).passed());

    rewrite_row(&tmp.path().join("r"), 10, "10,7,0,0,Q");
    let report = VerifyReport::registry(&registry_path);
    assert!(matches!(
        report.first_error(),
        Some(VerifyError::ReplayMismatch { .. })
    ));
}
