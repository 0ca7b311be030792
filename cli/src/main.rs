//! # sbm - structural bundle monitor
//!
//! Thin front end over `sbm-harness`.
//!
//! ```bash
//! # Produce one bundle
//! sbm run --operator digitsum_mod9 --n 1000 --h 5 --alignment parity_balance --out run1
//! sbm run --config run.toml --out run2
//!
//! # Verify
//! sbm verify --bundle run1
//! sbm verify --primary run1 --replay run2 --report report.txt
//! sbm verify --registry capsule/registry.toml
//!
//! # Record a bundle in a capsule registry
//! sbm capsule --registry capsule/registry.toml --name phase_a --bundle capsule/phase_a
//!
//! # Three-phase conformance sequence
//! sbm phases --work-dir work --capsule-dir capsule
//! ```
//!
//! Status lines go to stdout; logs go to stderr.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // SBM_LOG_FORMAT=json enables machine-parseable logs.
    let log_format = std::env::var("SBM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sbm_harness=info,sbm=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();
    let code = cli::execute(cli);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
