//! Operators: pure deterministic magnitude generators.
//!
//! An operator maps `(t, declared params)` to `m(t)` for every `t ≥ 1`. It
//! carries no hidden mutable state: two streams built from the same operator
//! yield identical magnitudes on any machine.
//!
//! Depends on nothing else in the kernel except `error`.

pub mod families;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One operator parameter value: an integer, or one of a declared set of
/// names (e.g. an observation mode).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(u64),
    Name(String),
}

impl ParamValue {
    #[must_use]
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Name(_) => None,
        }
    }

    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Resolved operator parameters, keyed by declared name.
///
/// `BTreeMap` so the profile echo is ordered.
pub type OperatorParams = BTreeMap<String, ParamValue>;

/// One position of the raw stream: tick `t` (1-based) and magnitude `m(t)`.
///
/// Immutable once produced. Nothing downstream rewrites `m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub t: u64,
    pub m: u64,
}

/// A registered deterministic sequence generator.
pub trait Operator: std::fmt::Debug + Send + Sync {
    /// Stable registry identifier (e.g., `"digitsum_mod9"`).
    fn id(&self) -> &'static str;

    /// Every declared parameter with its resolved value (defaults included).
    fn params(&self) -> OperatorParams;

    /// The magnitude stream `m(1), m(2), ...`. Unbounded; callers `take(n)`.
    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_>;

    /// `m(t)` for a single tick, computed independently of any stream.
    ///
    /// `t` is 1-based; `t == 0` has no magnitude.
    fn magnitude_at(&self, t: u64) -> Option<u64> {
        let index = usize::try_from(t.checked_sub(1)?).ok()?;
        self.magnitudes().nth(index)
    }

    /// First tick generated under a shifted regime, if the operator declares
    /// one. Metrics report the alphabet size around this tick.
    fn regime_shift(&self) -> Option<u64> {
        None
    }
}

/// The first `n` ticks of `operator`, in strictly increasing `t`.
pub fn ticks(operator: &dyn Operator, n: u64) -> impl Iterator<Item = Tick> + '_ {
    (1..=n).zip(operator.magnitudes()).map(|(t, m)| Tick { t, m })
}
