//! Kernel error kinds.
//!
//! Both kinds are fatal. A [`ConfigError`] is raised before any tick is
//! processed; a [`ConsistencyError`] means the declared predicate table is
//! defective and is never defaulted away.

/// Invalid or missing declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The operator identifier is not registered.
    #[error("unknown operator: {id}")]
    UnknownOperator { id: String },
    /// A parameter was supplied that the operator does not declare.
    #[error("operator {operator} does not declare parameter {name}")]
    UnknownParameter { operator: String, name: String },
    /// A declared parameter is outside its valid domain.
    #[error("invalid parameter {name}: {detail}")]
    InvalidParameter { name: String, detail: String },
    /// Horizon must be at least 1.
    #[error("horizon H must be >= 1, got {h}")]
    InvalidHorizon { h: usize },
    /// Sequence length must be at least 1.
    #[error("sequence length N must be >= 1")]
    EmptySequence,
    /// No alignment predicate set was declared.
    #[error("alignment predicate set is not declared")]
    UndeclaredAlignment,
    /// The declared alignment predicate set is not known.
    #[error("unknown alignment predicate set: {name}")]
    UnknownAlignment { name: String },
    /// The declared posture policy is not known.
    #[error("unknown posture policy: {name}")]
    UnknownPosturePolicy { name: String },
    /// Output location is not usable for a fresh run.
    #[error("output location not usable: {detail}")]
    OutputNotUsable { detail: String },
}

/// The alphabet predicate table failed to classify a state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// No predicate matched; the table is not complete over the state space.
    #[error("no alphabet predicate matched at t={t} (a={a}, s={s}, dA={d_a}, dS={d_s})")]
    NoPredicateMatched {
        t: u64,
        a: i64,
        s: i64,
        d_a: i64,
        d_s: i64,
    },
}
