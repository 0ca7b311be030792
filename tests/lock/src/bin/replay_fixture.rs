//! Runs every fixture workload into a scratch directory, self-verifies each
//! bundle, and prints one canonical JSON record per workload on stdout.
//!
//! Exit code 0 when every workload ran and verified, 1 otherwise (the cause
//! goes to stderr).

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use lock_tests::fixture::{record, workloads};
use sbm_harness::bundle_dir::verify_bundle_dir;
use sbm_harness::runner::run_bundle;
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::proof::canon::canonical_json_line;

fn main() -> ExitCode {
    let scratch = std::env::temp_dir().join(format!("sbm_replay_fixture_{}", std::process::id()));
    let result = emit_records(&scratch);
    let _ = std::fs::remove_dir_all(&scratch);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("replay_fixture: {message}");
            ExitCode::FAILURE
        }
    }
}

fn emit_records(scratch: &Path) -> Result<(), String> {
    let registry = default_registry();
    let mut out = Vec::new();
    for (i, spec) in workloads().iter().enumerate() {
        let dir = scratch.join(format!("w{i}"));
        let summary =
            run_bundle(spec, &registry, &dir).map_err(|e| format!("{}: {e}", spec.operator))?;
        verify_bundle_dir(&dir).map_err(|e| format!("{}: {e}", spec.operator))?;
        let line = canonical_json_line(&record(spec, &summary)).map_err(|e| e.to_string())?;
        out.extend_from_slice(&line);
    }
    std::io::stdout()
        .write_all(&out)
        .map_err(|e| format!("write stdout: {e}"))
}
