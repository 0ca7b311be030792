//! `StructuralStateEngine`: the sequential fold `m(t) → (m, a, s)`.
//!
//! For every tick, strictly in order:
//!
//! 1. push `m(t)` into the [`TrailingWindow`] (evicting beyond `H`)
//! 2. `a(t) = alignment(window)`
//! 3. `s(t) = posture(s(t-1), a(t))`, bounded by the declared policy
//! 4. `dA = a(t) - a(t-1)`, `dS = s(t) - s(t-1)`
//!
//! with baselines `a(0) = A_BASELINE`, `s(0) = S_BASELINE`. The running
//! posture lives in the engine value owned by one run; nothing is shared
//! between runs. The engine emits one [`StructuralState`] per push and keeps
//! no output buffer.

use super::window::TrailingWindow;
use crate::error::ConfigError;

/// Alignment baseline `a(0)`.
pub const A_BASELINE: i64 = 0;

/// Posture baseline `s(0)`.
pub const S_BASELINE: i64 = 0;

/// Largest accepted horizon.
pub const MAX_HORIZON: usize = 1 << 20;

/// Largest accepted posture bound.
pub const MAX_POSTURE_BOUND: i64 = 1 << 40;

/// Derived structural state at one tick. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralState {
    pub t: u64,
    /// Raw magnitude, exactly as the operator produced it.
    pub m: u64,
    pub a: i64,
    pub s: i64,
    pub d_a: i64,
    pub d_s: i64,
}

// ---------------------------------------------------------------------------
// AlignmentRule
// ---------------------------------------------------------------------------

/// The declared predicate set computing `a(t)` from the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentRule {
    /// `#odd - #even` over the window. Range `[-H, H]`.
    ParityBalance,
    /// `#rises - #falls` over consecutive window pairs. Range `[-(H-1), H-1]`.
    RiseFall,
    /// `sign(newest - oldest)`. Range `[-1, 1]`.
    AnchorCompare,
}

impl AlignmentRule {
    pub const ALL: &'static [Self] = &[Self::ParityBalance, Self::RiseFall, Self::AnchorCompare];

    /// Canonical name, as echoed in the run profile.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParityBalance => "parity_balance",
            Self::RiseFall => "rise_fall",
            Self::AnchorCompare => "anchor_compare",
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAlignment`] for an unrecognised name.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|rule| rule.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownAlignment {
                name: name.to_string(),
            })
    }

    /// Largest `|a|` this rule can produce for horizon `h`.
    #[must_use]
    pub fn bound(self, h: usize) -> i64 {
        let h = to_i64(h as u64);
        match self {
            Self::ParityBalance => h,
            Self::RiseFall => h - 1,
            Self::AnchorCompare => 1,
        }
    }

    /// `a(t)` from the current window contents.
    #[must_use]
    pub fn evaluate(self, window: &TrailingWindow) -> i64 {
        match self {
            Self::ParityBalance => to_i64(window.odd_count()) - to_i64(window.even_count()),
            Self::RiseFall => to_i64(window.rises()) - to_i64(window.falls()),
            Self::AnchorCompare => match (window.oldest(), window.newest()) {
                (Some(oldest), Some(newest)) => match newest.cmp(&oldest) {
                    std::cmp::Ordering::Greater => 1,
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                },
                _ => 0,
            },
        }
    }
}

/// Window counts are bounded by `MAX_HORIZON`, far below `i64::MAX`.
fn to_i64(x: u64) -> i64 {
    i64::try_from(x).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// Posture
// ---------------------------------------------------------------------------

/// How `s_prev + a` is kept inside `[-B, B]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosturePolicy {
    /// Saturate at the bound.
    Clamp,
    /// Wrap modulo `2B + 1` back into `[-B, B]`.
    Wrap,
}

impl PosturePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Wrap => "wrap",
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPosturePolicy`] for an unrecognised name.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "clamp" => Ok(Self::Clamp),
            "wrap" => Ok(Self::Wrap),
            other => Err(ConfigError::UnknownPosturePolicy {
                name: other.to_string(),
            }),
        }
    }
}

/// Declared posture accumulation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostureRule {
    policy: PosturePolicy,
    bound: i64,
}

impl PostureRule {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] unless `1 <= bound <= MAX_POSTURE_BOUND`.
    pub fn new(policy: PosturePolicy, bound: i64) -> Result<Self, ConfigError> {
        if !(1..=MAX_POSTURE_BOUND).contains(&bound) {
            return Err(ConfigError::InvalidParameter {
                name: "posture_bound".into(),
                detail: format!("{bound} outside [1, {MAX_POSTURE_BOUND}]"),
            });
        }
        Ok(Self { policy, bound })
    }

    #[must_use]
    pub fn policy(&self) -> PosturePolicy {
        self.policy
    }

    #[must_use]
    pub fn bound(&self) -> i64 {
        self.bound
    }

    /// `s(t)` from `s(t-1)` and `a(t)`. Result always lies in `[-B, B]`.
    #[must_use]
    pub fn apply(&self, s_prev: i64, a: i64) -> i64 {
        let b = self.bound;
        let raw = s_prev.saturating_add(a);
        match self.policy {
            PosturePolicy::Clamp => raw.clamp(-b, b),
            PosturePolicy::Wrap => (raw + b).rem_euclid(2 * b + 1) - b,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Declared engine configuration. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub horizon: usize,
    pub alignment: AlignmentRule,
    pub posture: PostureRule,
}

/// The sequential structural fold for one run.
#[derive(Debug, Clone)]
pub struct StructuralStateEngine {
    config: EngineConfig,
    window: TrailingWindow,
    t: u64,
    a_prev: i64,
    s_prev: i64,
}

impl StructuralStateEngine {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHorizon`] unless `1 <= H <= MAX_HORIZON`.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if config.horizon > MAX_HORIZON {
            return Err(ConfigError::InvalidHorizon { h: config.horizon });
        }
        Ok(Self {
            config,
            window: TrailingWindow::new(config.horizon)?,
            t: 0,
            a_prev: A_BASELINE,
            s_prev: S_BASELINE,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The window as of the last push.
    #[must_use]
    pub fn window(&self) -> &TrailingWindow {
        &self.window
    }

    /// Ticks folded so far.
    #[must_use]
    pub fn ticks_seen(&self) -> u64 {
        self.t
    }

    /// Fold the next magnitude `m(t)`, `t = ticks_seen() + 1`.
    pub fn push(&mut self, m: u64) -> StructuralState {
        self.t += 1;
        self.window.push(m);

        let a = self.config.alignment.evaluate(&self.window);
        let s = self.config.posture.apply(self.s_prev, a);
        let state = StructuralState {
            t: self.t,
            m,
            a,
            s,
            d_a: a - self.a_prev,
            d_s: s - self.s_prev,
        };

        self.a_prev = a;
        self.s_prev = s;
        state
    }
}
