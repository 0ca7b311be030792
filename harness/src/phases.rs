//! `PhaseOrchestrator`: the three-phase conformance sequence.
//!
//! | phase | check                                                          |
//! |-------|----------------------------------------------------------------|
//! | A     | small-scale direct replay (primary vs replay, pairwise)       |
//! | B     | large-scale direct replay                                     |
//! | C     | registry-based capsule verification                           |
//!
//! State machine: `NotRun → ADone → BDone → CDone → Aggregated`. The only
//! way to advance is [`PhaseOrchestrator::step`], which always moves to the
//! next state, so phases cannot run out of order or be skipped. Every phase
//! runs regardless of earlier verdicts. A phase's `Err` or panic becomes that
//! phase's FAIL verdict; nothing is retried.
//!
//! Primary and replay runs of a replay phase share no mutable state and run
//! concurrently on scoped threads.

use std::any::Any;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use sbm_kernel::operators::families::{DIGITSUM_MOD9, XORSHIFT_PARITY};
use sbm_kernel::operators::registry::{default_registry, OperatorRegistry};
use sbm_kernel::params::RunSpec;
use sbm_kernel::structural::engine::AlignmentRule;

use crate::error::RunError;
use crate::runner::{run_bundle, RunSummary};
use crate::verify::{pass_fail, verify_pair, VerifyReport, EXIT_FAIL, EXIT_PASS};

/// Registry filename expected inside the capsule directory.
pub const REGISTRY_FILE: &str = "registry.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseId {
    A,
    B,
    C,
}

impl PhaseId {
    #[must_use]
    pub const fn letter(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    fn work_subdir(self) -> &'static str {
        match self {
            Self::A => "phase_a",
            Self::B => "phase_b",
            Self::C => "phase_c",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    NotRun,
    ADone,
    BDone,
    CDone,
    Aggregated,
}

/// Verdict of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: PhaseId,
    pub passed: bool,
    /// Human-readable failure reason; `None` on pass.
    pub reason: Option<String>,
}

/// Workloads and locations for one orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    /// Replay phases write `<work_dir>/phase_x/{primary,replay}`.
    pub work_dir: PathBuf,
    pub phase_a: RunSpec,
    pub phase_b: RunSpec,
    /// Capsule registry checked by phase C.
    pub registry: PathBuf,
}

impl PhasePlan {
    /// The reference workload: A is `digitsum_mod9` N=1000 H=5, B is
    /// `xorshift_parity` N=200000 H=18, C reads `<capsule_dir>/registry.toml`.
    #[must_use]
    pub fn new(work_dir: &Path, capsule_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            phase_a: RunSpec::new(DIGITSUM_MOD9, 1_000, 5, AlignmentRule::ParityBalance),
            phase_b: RunSpec::new(XORSHIFT_PARITY, 200_000, 18, AlignmentRule::RiseFall),
            registry: capsule_dir.join(REGISTRY_FILE),
        }
    }
}

/// Aggregate of all three phase verdicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub outcomes: Vec<PhaseOutcome>,
}

impl PhaseReport {
    /// Pass iff all three phases ran and passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.len() == 3 && self.outcomes.iter().all(|o| o.passed)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            EXIT_PASS
        } else {
            EXIT_FAIL
        }
    }

    /// `PHASE_X_STATUS` / `PHASE_X_REASON` lines, then the aggregate.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for o in &self.outcomes {
            let letter = o.phase.letter();
            let _ = writeln!(out, "PHASE_{letter}_STATUS: {}", pass_fail(o.passed));
            if let Some(reason) = &o.reason {
                let _ = writeln!(out, "PHASE_{letter}_REASON: {reason}");
            }
        }
        let _ = writeln!(out, "OVERALL_STATUS: {}", pass_fail(self.passed()));
        let _ = writeln!(out, "EXIT_CODE: {}", self.exit_code());
        out
    }
}

/// Runs the phase sequence of one [`PhasePlan`].
#[derive(Debug)]
pub struct PhaseOrchestrator {
    plan: PhasePlan,
    operators: OperatorRegistry,
    state: OrchestratorState,
    outcomes: Vec<PhaseOutcome>,
}

impl PhaseOrchestrator {
    #[must_use]
    pub fn new(plan: PhasePlan) -> Self {
        Self::with_operators(plan, default_registry())
    }

    #[must_use]
    pub fn with_operators(plan: PhasePlan, operators: OperatorRegistry) -> Self {
        Self {
            plan,
            operators,
            state: OrchestratorState::NotRun,
            outcomes: Vec::with_capacity(3),
        }
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Verdicts recorded so far, in phase order.
    #[must_use]
    pub fn outcomes(&self) -> &[PhaseOutcome] {
        &self.outcomes
    }

    /// Advance exactly one transition. A no-op once `Aggregated`.
    pub fn step(&mut self) -> OrchestratorState {
        self.state = match self.state {
            OrchestratorState::NotRun => {
                self.record(PhaseId::A);
                OrchestratorState::ADone
            }
            OrchestratorState::ADone => {
                self.record(PhaseId::B);
                OrchestratorState::BDone
            }
            OrchestratorState::BDone => {
                self.record(PhaseId::C);
                OrchestratorState::CDone
            }
            OrchestratorState::CDone | OrchestratorState::Aggregated => {
                OrchestratorState::Aggregated
            }
        };
        self.state
    }

    /// Step to `Aggregated` and return the report.
    #[must_use]
    pub fn run(mut self) -> PhaseReport {
        while self.step() != OrchestratorState::Aggregated {}
        let passed = self.outcomes.iter().all(|o| o.passed);
        info!(overall = pass_fail(passed), "phases aggregated");
        PhaseReport {
            outcomes: self.outcomes,
        }
    }

    fn record(&mut self, phase: PhaseId) {
        let result = catch_unwind(AssertUnwindSafe(|| self.execute(phase)))
            .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_message(&*payload))));
        let outcome = match result {
            Ok(()) => {
                info!(phase = phase.letter(), "phase passed");
                PhaseOutcome {
                    phase,
                    passed: true,
                    reason: None,
                }
            }
            Err(reason) => {
                warn!(phase = phase.letter(), %reason, "phase failed");
                PhaseOutcome {
                    phase,
                    passed: false,
                    reason: Some(reason),
                }
            }
        };
        self.outcomes.push(outcome);
    }

    fn execute(&self, phase: PhaseId) -> Result<(), String> {
        match phase {
            PhaseId::A => self.replay_phase(phase, &self.plan.phase_a),
            PhaseId::B => self.replay_phase(phase, &self.plan.phase_b),
            PhaseId::C => registry_phase(&self.plan.registry),
        }
    }

    fn replay_phase(&self, phase: PhaseId, spec: &RunSpec) -> Result<(), String> {
        let dir = self.plan.work_dir.join(phase.work_subdir());
        // The work directory belongs to the orchestrator; stale bundles from
        // an earlier invocation would make the runs refuse their output dirs.
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .map_err(|e| format!("clear {}: {e}", dir.display()))?;
        }
        let primary = dir.join("primary");
        let replay = dir.join("replay");

        let (first, second) = std::thread::scope(|s| {
            let a = s.spawn(|| run_bundle(spec, &self.operators, &primary));
            let b = s.spawn(|| run_bundle(spec, &self.operators, &replay));
            (a.join(), b.join())
        });
        joined("primary", first)?;
        joined("replay", second)?;

        verify_pair(&primary, &replay).map_err(|e| e.to_string())
    }
}

fn registry_phase(registry: &Path) -> Result<(), String> {
    if !registry.is_file() {
        return Err(format!("registry not found: {}", registry.display()));
    }
    let report = VerifyReport::registry(registry);
    if report.passed() {
        return Ok(());
    }
    Err(report
        .first_error()
        .map_or_else(|| "no bundles verified".to_string(), ToString::to_string))
}

fn joined(
    label: &str,
    result: std::thread::Result<Result<RunSummary, RunError>>,
) -> Result<RunSummary, String> {
    match result {
        Ok(Ok(summary)) => Ok(summary),
        Ok(Err(e)) => Err(format!("{label} run: {e}")),
        Err(payload) => Err(format!("{label} run panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}
