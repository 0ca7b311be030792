//! Any single-byte change to any artifact or to the manifest is caught by
//! the bundle self-check, and the verifier maps it to a failing exit code.

use std::path::Path;

use lock_tests::bundle_test_helpers::{copy_bundle, flip_byte, reference_spec, run_into, sha256_hex};
use sbm_harness::artifacts::{ARTIFACT_FILES, MANIFEST_FILE};
use sbm_harness::bundle_dir::verify_bundle_dir;
use sbm_harness::error::VerifyError;
use sbm_harness::registry::{capsule_entry, CapsuleRegistry};
use sbm_harness::verify::{VerifyReport, EXIT_FAIL, EXIT_PASS};

#[test]
fn flipping_any_artifact_byte_is_a_hash_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let pristine = tmp.path().join("pristine");
    run_into(&reference_spec(), &pristine);
    assert_eq!(VerifyReport::bundle(&pristine).exit_code(), EXIT_PASS);

    for name in ARTIFACT_FILES {
        let len = std::fs::metadata(pristine.join(name)).unwrap().len();
        let len = usize::try_from(len).unwrap();
        for offset in [0, len / 2, len - 1] {
            let copy = tmp.path().join(format!("{name}_{offset}"));
            copy_bundle(&pristine, &copy);
            flip_byte(&copy.join(name), offset);

            match verify_bundle_dir(&copy) {
                Err(VerifyError::HashMismatch {
                    name: bad,
                    expected,
                    actual,
                }) => {
                    assert_eq!(bad, name);
                    assert_ne!(expected, actual);
                }
                other => panic!("{name}@{offset}: expected HashMismatch, got {other:?}"),
            }
            assert_eq!(VerifyReport::bundle(&copy).exit_code(), EXIT_FAIL);
        }
    }
}

#[test]
fn flipping_any_manifest_byte_fails_the_self_check() {
    let tmp = tempfile::tempdir().unwrap();
    let pristine = tmp.path().join("pristine");
    run_into(&reference_spec(), &pristine);

    let len = std::fs::metadata(pristine.join(MANIFEST_FILE)).unwrap().len();
    let len = usize::try_from(len).unwrap();
    for offset in [0, 64, len / 2, len - 2, len - 1] {
        let copy = tmp.path().join(format!("manifest_{offset}"));
        copy_bundle(&pristine, &copy);
        flip_byte(&copy.join(MANIFEST_FILE), offset);

        let result = verify_bundle_dir(&copy);
        assert!(
            matches!(
                result,
                Err(VerifyError::ManifestMalformed { .. } | VerifyError::HashMismatch { .. })
            ),
            "manifest@{offset}: {result:?}"
        );
        assert_eq!(VerifyReport::bundle(&copy).exit_code(), EXIT_FAIL);
    }
}

#[test]
fn final_newline_swapped_for_vertical_tab_is_malformed() {
    let tmp = tempfile::tempdir().unwrap();
    let cap = tmp.path().join("capsule");
    let bundle = cap.join("ref");
    run_into(&reference_spec(), &bundle);

    let registry_path = cap.join("registry.toml");
    CapsuleRegistry {
        entries: vec![capsule_entry("ref", &bundle, Path::new("ref")).unwrap()],
    }
    .save(&registry_path)
    .unwrap();
    assert_eq!(VerifyReport::registry(&registry_path).exit_code(), EXIT_PASS);

    let manifest = bundle.join(MANIFEST_FILE);
    let len = usize::try_from(std::fs::metadata(&manifest).unwrap().len()).unwrap();
    flip_byte(&manifest, len - 1);
    assert_eq!(std::fs::read(&manifest).unwrap().last(), Some(&0x0B));

    assert!(matches!(
        verify_bundle_dir(&bundle),
        Err(VerifyError::ManifestMalformed { .. })
    ));
    assert_eq!(VerifyReport::bundle(&bundle).exit_code(), EXIT_FAIL);
    assert_eq!(VerifyReport::registry(&registry_path).exit_code(), EXIT_FAIL);
}

#[test]
fn missing_artifact_is_reported_by_name() {
    let tmp = tempfile::tempdir().unwrap();
    run_into(&reference_spec(), tmp.path());
    std::fs::remove_file(tmp.path().join(ARTIFACT_FILES[1])).unwrap();
    assert!(matches!(
        verify_bundle_dir(tmp.path()),
        Err(VerifyError::MissingArtifact { ref name }) if name == ARTIFACT_FILES[1]
    ));
}

#[test]
fn manifest_digests_match_an_independent_sha256() {
    let tmp = tempfile::tempdir().unwrap();
    run_into(&reference_spec(), tmp.path());

    let text = std::fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), ARTIFACT_FILES.len());
    for (line, name) in lines.iter().zip(ARTIFACT_FILES) {
        let bytes = std::fs::read(tmp.path().join(name)).unwrap();
        assert_eq!(*line, format!("{}  {name}", sha256_hex(&bytes)));
    }
    assert!(text.ends_with('\n'));
}

#[test]
fn truncated_manifest_is_malformed_not_a_pass() {
    let tmp = tempfile::tempdir().unwrap();
    run_into(&reference_spec(), tmp.path());
    let path = tmp.path().join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&path).unwrap();
    let first_line = text.lines().next().unwrap();
    std::fs::write(&path, format!("{first_line}\n")).unwrap();

    assert!(matches!(
        verify_bundle_dir(tmp.path()),
        Err(VerifyError::ManifestMalformed { .. })
    ));
}
