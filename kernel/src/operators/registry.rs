//! `OperatorRegistry`: stable string identifier → operator contract.
//!
//! Each entry declares the operator's parameters (name, kind, default, valid
//! range or choice set) and a constructor. [`OperatorRegistry::build`]
//! resolves caller-supplied parameters against the declaration before
//! constructing anything, so an unknown identifier or an out-of-range
//! parameter fails before any tick.

use std::collections::BTreeMap;

use super::families::{
    CollatzParity, DigitSumResidue, LcgXorParity, Sha1Parity, SsntClosure, XorshiftParity,
    COLLATZ_PARITY, DIGITSUM_MOD9, LCG_OBS_MODES, LCG_STREAM_MODES, LCG_XOR_PARITY, SHA1_PARITY,
    SSNT_CLOSURE, XORSHIFT_PARITY,
};
use super::{Operator, OperatorParams, ParamValue};
use crate::error::ConfigError;

/// What values a declared parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Integer in the inclusive range `[min, max]`.
    Int { default: u64, min: u64, max: u64 },
    /// One of a fixed set of names.
    Choice {
        default: &'static str,
        choices: &'static [&'static str],
    },
}

/// A declared operator parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamDecl {
    const fn int(name: &'static str, default: u64, min: u64, max: u64) -> Self {
        Self {
            name,
            kind: ParamKind::Int { default, min, max },
        }
    }

    const fn choice(
        name: &'static str,
        default: &'static str,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice { default, choices },
        }
    }

    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Choice { default, .. } => ParamValue::from(default),
        }
    }

    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] for a value of the wrong kind, out of
    /// range, or not among the declared choices.
    pub fn check(&self, value: &ParamValue) -> Result<(), ConfigError> {
        let invalid = |detail: String| ConfigError::InvalidParameter {
            name: self.name.to_string(),
            detail,
        };
        match (self.kind, value) {
            (ParamKind::Int { min, max, .. }, ParamValue::Int(v)) => {
                if *v < min || *v > max {
                    return Err(invalid(format!("{v} outside [{min}, {max}]")));
                }
                Ok(())
            }
            (ParamKind::Choice { choices, .. }, ParamValue::Name(name)) => {
                if choices.contains(&name.as_str()) {
                    Ok(())
                } else {
                    Err(invalid(format!("{name} is not one of {}", choices.join(", "))))
                }
            }
            (ParamKind::Int { .. }, ParamValue::Name(name)) => {
                Err(invalid(format!("expected an integer, got {name}")))
            }
            (ParamKind::Choice { choices, .. }, ParamValue::Int(v)) => Err(invalid(format!(
                "expected one of {}, got {v}",
                choices.join(", ")
            ))),
        }
    }
}

type Constructor = fn(&OperatorParams) -> Result<Box<dyn Operator>, ConfigError>;

/// A single entry in the operator registry.
#[derive(Clone)]
pub struct OperatorEntry {
    /// Stable identifier.
    pub id: &'static str,
    /// One-line description (diagnostic only).
    pub description: &'static str,
    /// Declared parameters, in name order.
    pub params: Vec<ParamDecl>,
    construct: Constructor,
}

impl std::fmt::Debug for OperatorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorEntry")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl OperatorEntry {
    /// Fill defaults, reject undeclared names, enforce declared ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownParameter`] or [`ConfigError::InvalidParameter`].
    pub fn resolve(&self, supplied: &OperatorParams) -> Result<OperatorParams, ConfigError> {
        for name in supplied.keys() {
            if !self.params.iter().any(|decl| decl.name == name) {
                return Err(ConfigError::UnknownParameter {
                    operator: self.id.to_string(),
                    name: name.clone(),
                });
            }
        }

        let mut resolved = BTreeMap::new();
        for decl in &self.params {
            let value = supplied
                .get(decl.name)
                .cloned()
                .unwrap_or_else(|| decl.default_value());
            decl.check(&value)?;
            resolved.insert(decl.name.to_string(), value);
        }
        Ok(resolved)
    }
}

/// The operator registry. `BTreeMap` for deterministic listing order.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    entries: BTreeMap<&'static str, OperatorEntry>,
}

impl OperatorRegistry {
    /// Look up an entry by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OperatorEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Resolve `id` and its parameters, then construct the operator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOperator`] for an unregistered `id`, or the
    /// resolution error for bad parameters.
    pub fn build(
        &self,
        id: &str,
        supplied: &OperatorParams,
    ) -> Result<Box<dyn Operator>, ConfigError> {
        let entry = self
            .get(id)
            .ok_or_else(|| ConfigError::UnknownOperator { id: id.to_string() })?;
        let resolved = entry.resolve(supplied)?;
        (entry.construct)(&resolved)
    }

    fn register(&mut self, entry: OperatorEntry) {
        self.entries.insert(entry.id, entry);
    }
}

fn construct_digitsum(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(DigitSumResidue::from_params(p)?))
}

fn construct_xorshift(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(XorshiftParity::from_params(p)?))
}

fn construct_collatz(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(CollatzParity::from_params(p)?))
}

fn construct_lcg(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(LcgXorParity::from_params(p)?))
}

fn construct_sha1(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(Sha1Parity::from_params(p)?))
}

fn construct_ssnt(p: &OperatorParams) -> Result<Box<dyn Operator>, ConfigError> {
    Ok(Box::new(SsntClosure::from_params(p)?))
}

/// Build the registry of all operator families shipped with the kernel.
#[must_use]
pub fn default_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::default();

    registry.register(OperatorEntry {
        id: DIGITSUM_MOD9,
        description: "digit-sum residue of t + offset in the given base",
        params: vec![
            ParamDecl::int("base", 10, 2, u64::from(u32::MAX)),
            ParamDecl::int("modulus", 9, 1, u64::MAX),
            ParamDecl::int("offset", 0, 0, u64::MAX),
        ],
        construct: construct_digitsum,
    });

    registry.register(OperatorEntry {
        id: XORSHIFT_PARITY,
        description: "low bit of a fixed-seed xorshift32 register",
        // A zero register never leaves zero.
        params: vec![ParamDecl::int(
            "seed",
            2_463_534_242,
            1,
            u64::from(u32::MAX),
        )],
        construct: construct_xorshift,
    });

    registry.register(OperatorEntry {
        id: COLLATZ_PARITY,
        description: "parity of the Collatz trajectory from seed",
        params: vec![ParamDecl::int("seed", 27, 1, u64::MAX)],
        construct: construct_collatz,
    });

    registry.register(OperatorEntry {
        id: LCG_XOR_PARITY,
        description: "observed bit of successive LCG states, with an optional regime shift",
        params: vec![
            ParamDecl::int("a", 1_664_525, 0, u64::MAX),
            ParamDecl::int("a2", 22_695_477, 0, u64::MAX),
            ParamDecl::int("c", 1_013_904_223, 0, u64::MAX),
            ParamDecl::int("c2", 1, 0, u64::MAX),
            ParamDecl::int("modulus", 1 << 32, 1, u64::MAX),
            ParamDecl::choice("obs", "popcnt_parity", LCG_OBS_MODES),
            ParamDecl::choice("post_mode", "lcg", LCG_STREAM_MODES),
            ParamDecl::choice("pre_mode", "lcg", LCG_STREAM_MODES),
            ParamDecl::int("seed", 123_456_789, 0, u64::MAX),
            // 0 disables the shift.
            ParamDecl::int("shift_n", 0, 0, i64::MAX.unsigned_abs()),
        ],
        construct: construct_lcg,
    });

    registry.register(OperatorEntry {
        id: SHA1_PARITY,
        description: "low bit of a register iterated through SHA-1",
        params: vec![ParamDecl::int("seed", 1, 0, u64::from(u32::MAX))],
        construct: construct_sha1,
    });

    registry.register(OperatorEntry {
        id: SSNT_CLOSURE,
        description: "smallest-divisor band and hardness bucket of t + offset",
        params: vec![
            ParamDecl::int("buckets", 1, 1, 1 << 16),
            ParamDecl::int("offset", 1, 0, u64::from(u32::MAX)),
            ParamDecl::int("t1", 3, 1, u64::from(u32::MAX)),
            ParamDecl::int("t2", 11, 1, u64::from(u32::MAX)),
            ParamDecl::int("t3", 31, 1, u64::from(u32::MAX)),
            ParamDecl::int("t4", 101, 1, u64::from(u32::MAX)),
        ],
        construct: construct_ssnt,
    });

    registry
}
