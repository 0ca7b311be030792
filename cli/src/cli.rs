//! Command definitions and dispatch.
//!
//! ## Commands
//!
//! - `run` - produce one artifact bundle
//! - `verify` - self-check, pairwise, or registry verification
//! - `capsule` - add a verified bundle to a capsule registry
//! - `phases` - run the three-phase conformance sequence

use std::path::{Component, Path, PathBuf};

use clap::{ArgGroup, Args, Parser, Subcommand};

use sbm_harness::phases::{PhaseOrchestrator, PhasePlan};
use sbm_harness::registry::{capsule_entry, CapsuleRegistry};
use sbm_harness::runner::run_bundle;
use sbm_harness::verify::{
    first_missing, VerifyReport, EXIT_FAIL, EXIT_INPUT_MISSING, EXIT_PASS,
    EXIT_REPORT_WRITE_FAILED,
};
use sbm_kernel::metrics::DEFAULT_LONG_STABLE;
use sbm_kernel::operators::registry::default_registry;
use sbm_kernel::operators::{OperatorParams, ParamValue};
use sbm_kernel::params::{
    RunSpec, DEFAULT_ALIGN_BAND, DEFAULT_POSTURE_BAND, DEFAULT_POSTURE_BOUND,
    DEFAULT_POSTURE_POLICY,
};

/// Deterministic, replay-verifiable sequence classification.
#[derive(Parser, Debug)]
#[command(name = "sbm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Produce one artifact bundle
    Run {
        #[command(flatten)]
        spec: SpecArgs,

        /// Output directory (must be absent or empty)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Verify bundles
    #[command(group(
        ArgGroup::new("mode")
            .required(true)
            .args(["bundle", "primary", "registry"])
    ))]
    Verify {
        /// Self-check one bundle
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Primary bundle of a pairwise comparison
        #[arg(long, requires = "replay")]
        primary: Option<PathBuf>,

        /// Replay bundle of a pairwise comparison
        #[arg(long, requires = "primary")]
        replay: Option<PathBuf>,

        /// Capsule registry file
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Also write the report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Add a bundle to a capsule registry (created if absent)
    Capsule {
        /// Registry file
        #[arg(long)]
        registry: PathBuf,

        /// Entry name
        #[arg(long)]
        name: String,

        /// Bundle directory
        #[arg(long)]
        bundle: PathBuf,

        /// Optional replay bundle compared pairwise during verification
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Run phases A, B, C and aggregate
    Phases {
        /// Directory for phase A/B bundles
        #[arg(long, default_value = "sbm_work")]
        work_dir: PathBuf,

        /// Directory holding registry.toml for phase C
        #[arg(long, default_value = "capsule")]
        capsule_dir: PathBuf,
    },
}

/// Declared run parameters, from a TOML file or flags.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["config", "operator"])
))]
pub struct SpecArgs {
    /// TOML file with the declared parameters
    #[arg(short, long, conflicts_with_all = ["operator", "n", "h", "alignment"])]
    pub config: Option<PathBuf>,

    /// Registered operator identifier
    #[arg(long, requires_all = ["n", "h"])]
    pub operator: Option<String>,

    /// Sequence length N
    #[arg(long)]
    pub n: Option<u64>,

    /// Horizon H
    #[arg(long)]
    pub h: Option<usize>,

    /// Alignment rule (parity_balance, rise_fall, anchor_compare)
    #[arg(long)]
    pub alignment: Option<String>,

    /// Posture policy (clamp, wrap)
    #[arg(long, default_value = DEFAULT_POSTURE_POLICY)]
    pub posture_policy: String,

    /// Posture bound B
    #[arg(long, default_value_t = DEFAULT_POSTURE_BOUND)]
    pub posture_bound: i64,

    #[arg(long, default_value_t = DEFAULT_ALIGN_BAND)]
    pub align_band: i64,

    #[arg(long, default_value_t = DEFAULT_POSTURE_BAND)]
    pub posture_band: i64,

    /// Stable-run length that makes an emergence a fracture candidate
    #[arg(long, default_value_t = DEFAULT_LONG_STABLE)]
    pub long_stable: u64,

    /// Operator parameter as name=value (repeatable); non-numeric values are names
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw}"))?;
    if name.is_empty() || value.is_empty() {
        return Err(format!("expected name=value, got {raw}"));
    }
    let value = if value.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        value
            .parse::<u64>()
            .map(ParamValue::Int)
            .map_err(|e| format!("{name}: {e}"))?
    } else {
        ParamValue::from(value)
    };
    Ok((name.to_string(), value))
}

impl SpecArgs {
    fn into_spec(self) -> Result<RunSpec, String> {
        if let Some(path) = self.config {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("read {}: {e}", path.display()))?;
            return toml::from_str(&text).map_err(|e| format!("parse {}: {e}", path.display()));
        }
        let params: OperatorParams = self.params.into_iter().collect();
        Ok(RunSpec {
            operator: self.operator.unwrap_or_default(),
            n: self.n.unwrap_or_default(),
            h: self.h.unwrap_or_default(),
            alignment: self.alignment,
            posture_policy: self.posture_policy,
            posture_bound: self.posture_bound,
            align_band: self.align_band,
            posture_band: self.posture_band,
            long_stable: self.long_stable,
            params,
        })
    }
}

/// Execute a parsed command; returns the process exit code.
pub fn execute(cli: Cli) -> i32 {
    match cli.command {
        Commands::Run { spec, out } => cmd_run(spec, &out),
        Commands::Verify {
            bundle,
            primary,
            replay,
            registry,
            report,
        } => cmd_verify(bundle, primary.zip(replay), registry, report.as_deref()),
        Commands::Capsule {
            registry,
            name,
            bundle,
            replay,
        } => cmd_capsule(&registry, &name, &bundle, replay.as_deref()),
        Commands::Phases {
            work_dir,
            capsule_dir,
        } => {
            let report = PhaseOrchestrator::new(PhasePlan::new(&work_dir, &capsule_dir)).run();
            print!("{}", report.render());
            report.exit_code()
        }
    }
}

fn cmd_run(args: SpecArgs, out: &Path) -> i32 {
    let spec = match args.into_spec() {
        Ok(spec) => spec,
        Err(e) => {
            tracing::error!("{e}");
            return EXIT_FAIL;
        }
    };
    match run_bundle(&spec, &default_registry(), out) {
        Ok(summary) => {
            println!("OUT: {}", summary.out_dir.display());
            println!("TICKS: {}", summary.ticks);
            println!("DISTINCT_SYMBOLS: {}", summary.distinct_symbols);
            print!("{}", summary.manifest.to_text());
            EXIT_PASS
        }
        Err(e) => {
            tracing::error!("{e}");
            EXIT_FAIL
        }
    }
}

fn cmd_verify(
    bundle: Option<PathBuf>,
    pair: Option<(PathBuf, PathBuf)>,
    registry: Option<PathBuf>,
    report_path: Option<&Path>,
) -> i32 {
    let inputs: Vec<&Path> = bundle
        .iter()
        .chain(pair.iter().flat_map(|(a, b)| [a, b]))
        .chain(registry.iter())
        .map(PathBuf::as_path)
        .collect();
    if let Some(missing) = first_missing(inputs) {
        println!("SBM CONFORMANCE VERIFIER");
        println!("ERROR: input not found: {}", missing.display());
        return EXIT_INPUT_MISSING;
    }

    let report = match (bundle, pair, registry) {
        (Some(dir), _, _) => VerifyReport::bundle(&dir),
        (_, Some((primary, replay)), _) => VerifyReport::pairwise(&primary, &replay),
        (_, _, Some(registry)) => VerifyReport::registry(&registry),
        (None, None, None) => return EXIT_INPUT_MISSING,
    };
    print!("{}", report.render());

    if let Some(path) = report_path {
        if let Err(e) = report.write_to(path) {
            tracing::error!("{e}");
            return EXIT_REPORT_WRITE_FAILED;
        }
    }
    report.exit_code()
}

fn cmd_capsule(registry_path: &Path, name: &str, bundle: &Path, replay: Option<&Path>) -> i32 {
    let mut registry = if registry_path.exists() {
        match CapsuleRegistry::load(registry_path) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!("{e}");
                return EXIT_FAIL;
            }
        }
    } else {
        CapsuleRegistry::default()
    };

    let relative = |p: &Path| registry_relative(registry_path, p);

    let mut entry = match capsule_entry(name, bundle, &relative(bundle)) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::error!("{e}");
            return EXIT_FAIL;
        }
    };
    entry.replay = replay.map(relative);

    registry.entries.retain(|e| e.name != name);
    registry.entries.push(entry);
    registry.entries.sort_by(|a, b| a.name.cmp(&b.name));

    match registry.save(registry_path) {
        Ok(()) => {
            println!("REGISTERED: {name}");
            EXIT_PASS
        }
        Err(e) => {
            tracing::error!("{e}");
            EXIT_FAIL
        }
    }
}

/// `p` relative to the registry's directory when it lies inside it,
/// otherwise `p` as given. Both sides are compared in normalized form.
fn registry_relative(registry_path: &Path, p: &Path) -> PathBuf {
    let base = normalize(registry_path.parent().unwrap_or_else(|| Path::new("")));
    normalize(p)
        .strip_prefix(&base)
        .map_or_else(|_| p.to_path_buf(), Path::to_path_buf)
}

/// Absolute form of `p` with `.` dropped and `..` applied lexically.
fn normalize(p: &Path) -> PathBuf {
    let absolute = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| p.to_path_buf(), |cwd| cwd.join(p))
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
