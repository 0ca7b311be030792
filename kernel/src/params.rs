//! Declared run parameters.
//!
//! [`RunSpec`] is the raw, serde-facing form (TOML file or CLI flags).
//! [`RunSpec::validate`] turns it into [`RunParams`], the only form the
//! pipeline accepts. Validation resolves the operator against the registry,
//! so every configuration error surfaces before a directory is touched or a
//! tick is computed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::alphabet::{Symbol, Thresholds, ALPHABET_VERSION};
use crate::error::ConfigError;
use crate::metrics::DEFAULT_LONG_STABLE;
use crate::operators::registry::OperatorRegistry;
use crate::operators::{Operator, OperatorParams};
use crate::proof::canon::{canonical_json_line, CanonError};
use crate::structural::engine::{
    AlignmentRule, EngineConfig, PosturePolicy, PostureRule, A_BASELINE, MAX_HORIZON, S_BASELINE,
};

/// Profile schema identifier.
pub const PROFILE_SCHEMA_VERSION: &str = "sbm.profile.v1";

pub const DEFAULT_POSTURE_POLICY: &str = "clamp";
pub const DEFAULT_POSTURE_BOUND: i64 = 64;
pub const DEFAULT_ALIGN_BAND: i64 = 0;
pub const DEFAULT_POSTURE_BAND: i64 = 8;

fn default_posture_policy() -> String {
    DEFAULT_POSTURE_POLICY.to_string()
}

fn default_posture_bound() -> i64 {
    DEFAULT_POSTURE_BOUND
}

fn default_posture_band() -> i64 {
    DEFAULT_POSTURE_BAND
}

fn default_long_stable() -> u64 {
    DEFAULT_LONG_STABLE
}

/// Declared parameters as written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    pub operator: String,
    pub n: u64,
    pub h: usize,
    /// Required; there is no default alignment rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default = "default_posture_policy")]
    pub posture_policy: String,
    #[serde(default = "default_posture_bound")]
    pub posture_bound: i64,
    #[serde(default)]
    pub align_band: i64,
    #[serde(default = "default_posture_band")]
    pub posture_band: i64,
    /// Minimum stable run before an emergence counts as a fracture candidate.
    #[serde(default = "default_long_stable")]
    pub long_stable: u64,
    /// Operator-specific parameters; undeclared names are rejected.
    #[serde(default)]
    pub params: OperatorParams,
}

impl RunSpec {
    /// A spec with every optional field at its default.
    #[must_use]
    pub fn new(operator: &str, n: u64, h: usize, alignment: AlignmentRule) -> Self {
        Self {
            operator: operator.to_string(),
            n,
            h,
            alignment: Some(alignment.as_str().to_string()),
            posture_policy: default_posture_policy(),
            posture_bound: DEFAULT_POSTURE_BOUND,
            align_band: DEFAULT_ALIGN_BAND,
            posture_band: DEFAULT_POSTURE_BAND,
            long_stable: DEFAULT_LONG_STABLE,
            params: OperatorParams::new(),
        }
    }

    /// Resolve against `registry`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found. Checks run in a fixed order:
    /// `n`, `h`, operator, alignment, posture, thresholds, `long_stable`.
    pub fn validate(&self, registry: &OperatorRegistry) -> Result<RunParams, ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::EmptySequence);
        }
        if self.h == 0 || self.h > MAX_HORIZON {
            return Err(ConfigError::InvalidHorizon { h: self.h });
        }
        let operator = registry.build(&self.operator, &self.params)?;

        let alignment = self
            .alignment
            .as_deref()
            .ok_or(ConfigError::UndeclaredAlignment)
            .and_then(AlignmentRule::parse)?;
        let policy = PosturePolicy::parse(&self.posture_policy)?;
        let posture = PostureRule::new(policy, self.posture_bound)?;

        let thresholds = Thresholds::new(self.align_band, self.posture_band)?;
        if thresholds.posture_band() >= posture.bound() {
            return Err(ConfigError::InvalidParameter {
                name: "posture_band".into(),
                detail: format!(
                    "{} must be below posture_bound {}",
                    thresholds.posture_band(),
                    posture.bound()
                ),
            });
        }
        if self.long_stable == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "long_stable".into(),
                detail: "must be at least 1".into(),
            });
        }

        Ok(RunParams {
            operator,
            n: self.n,
            long_stable: self.long_stable,
            engine: EngineConfig {
                horizon: self.h,
                alignment,
                posture,
            },
            thresholds,
        })
    }
}

/// Validated declared parameters for one run.
#[derive(Debug)]
pub struct RunParams {
    operator: Box<dyn Operator>,
    n: u64,
    long_stable: u64,
    engine: EngineConfig,
    thresholds: Thresholds,
}

impl RunParams {
    #[must_use]
    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    #[must_use]
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Stable-run length that qualifies a later emergence as a fracture.
    #[must_use]
    pub fn long_stable(&self) -> u64 {
        self.long_stable
    }

    #[must_use]
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Every declared parameter, with operator parameters fully resolved.
    /// Contains no timestamps, paths, or host details.
    #[must_use]
    pub fn profile(&self) -> Value {
        let params: OperatorParams = self.operator.params();
        let symbols: Vec<&str> = Symbol::ALL.iter().map(|s| s.code()).collect();
        json!({
            "schema_version": PROFILE_SCHEMA_VERSION,
            "operator": {
                "id": self.operator.id(),
                "params": params,
            },
            "n": self.n,
            "h": self.engine.horizon,
            "alignment": self.engine.alignment.as_str(),
            "posture": {
                "policy": self.engine.posture.policy().as_str(),
                "bound": self.engine.posture.bound(),
                "baseline": S_BASELINE,
            },
            "alignment_baseline": A_BASELINE,
            "thresholds": {
                "align_band": self.thresholds.align_band(),
                "posture_band": self.thresholds.posture_band(),
            },
            "fracture": {
                "long_stable": self.long_stable,
                "shift_t": self.operator.regime_shift(),
            },
            "alphabet": {
                "version": ALPHABET_VERSION,
                "symbols": symbols,
            },
        })
    }

    /// Canonical profile bytes, LF-terminated.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if the profile holds a non-integer number.
    pub fn profile_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_line(&self.profile())
    }
}
