//! The `replay_fixture` binary prints the same records from any working
//! directory and under any locale or unrelated environment, and those
//! records agree with bundles produced in-process.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use lock_tests::bundle_test_helpers::run_into;
use lock_tests::fixture::{record, workloads};

/// Variables cleared before every spawn so the baseline is the same on any host.
const CLEARED: [&str; 5] = ["LC_ALL", "LC_COLLATE", "LANG", "LANGUAGE", "RUST_LOG"];

enum Cwd {
    Workspace,
    TempDir,
}

struct Variant {
    label: &'static str,
    cwd: Cwd,
    env: &'static [(&'static str, &'static str)],
}

const VARIANTS: &[Variant] = &[
    Variant {
        label: "baseline",
        cwd: Cwd::Workspace,
        env: &[],
    },
    Variant {
        label: "temp cwd",
        cwd: Cwd::TempDir,
        env: &[],
    },
    Variant {
        label: "C locale",
        cwd: Cwd::Workspace,
        env: &[("LC_ALL", "C"), ("LANG", "C")],
    },
    Variant {
        label: "utf-8 locale with debug logs",
        cwd: Cwd::TempDir,
        env: &[("LANG", "de_DE.UTF-8"), ("RUST_LOG", "debug")],
    },
    Variant {
        label: "unrelated env",
        cwd: Cwd::Workspace,
        env: &[
            ("SBM_NOISE", "should_not_matter"),
            ("TZ", "Pacific/Chatham"),
            ("HOME", "/nonexistent"),
            ("SBM_LOG_FORMAT", "json"),
        ],
    },
];

/// `target/<profile>/replay_fixture`, next to the `deps/` holding this test.
fn fixture_binary() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let profile_dir = exe.parent().and_then(Path::parent).unwrap();
    profile_dir.join(format!("replay_fixture{}", std::env::consts::EXE_SUFFIX))
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .unwrap()
        .to_path_buf()
}

fn spawn(variant: &Variant) -> Vec<u8> {
    let cwd = match variant.cwd {
        Cwd::Workspace => workspace_root(),
        Cwd::TempDir => std::env::temp_dir(),
    };
    let mut command = Command::new(fixture_binary());
    command.current_dir(&cwd);
    for key in CLEARED {
        command.env_remove(key);
    }
    command.envs(variant.env.iter().copied());

    let output = command.output().unwrap();
    assert!(
        output.status.success(),
        "{}: exit {} stderr={}",
        variant.label,
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

fn parse_records(stdout: &[u8]) -> Vec<Value> {
    std::str::from_utf8(stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn records_are_identical_across_process_environments() {
    let baseline = spawn(&VARIANTS[0]);
    assert!(baseline.ends_with(b"\n"));
    assert!(!String::from_utf8_lossy(&baseline).contains(&*workspace_root().to_string_lossy()));

    for variant in &VARIANTS[1..] {
        assert_eq!(
            spawn(variant),
            baseline,
            "stdout differs under variant {:?}",
            variant.label
        );
    }
}

#[test]
fn records_match_in_process_bundles() {
    let records = parse_records(&spawn(&VARIANTS[0]));
    let specs = workloads();
    assert_eq!(records.len(), specs.len());

    let tmp = tempfile::tempdir().unwrap();
    for (i, (spec, fixture_record)) in specs.iter().zip(&records).enumerate() {
        let summary = run_into(spec, &tmp.path().join(format!("w{i}")));
        assert_eq!(
            fixture_record,
            &record(spec, &summary),
            "workload {i} ({}) differs between processes",
            spec.operator
        );
        assert_eq!(fixture_record["artifacts"].as_object().unwrap().len(), 4);
    }
}

#[test]
fn shifted_workload_is_part_of_the_fixture() {
    let records = parse_records(&spawn(&VARIANTS[0]));
    let shifted: Vec<&Value> = records
        .iter()
        .filter(|r| r["params"]["shift_n"].is_u64())
        .collect();
    assert_eq!(shifted.len(), 1);
    assert_eq!(shifted[0]["params"]["post_mode"], "ramp");
    assert_eq!(shifted[0]["long_stable"], 200);
}
