//! `AlphabetAssigner`: closed, first-match-wins classification of structural states.
//!
//! # Alphabet `sbm.alphabet.v1`
//!
//! Σ = {Q, U, L, R, F, N}, evaluated in this priority order:
//!
//! | symbol | predicate                                             |
//! |--------|-------------------------------------------------------|
//! | `Q`    | `dA == 0 && dS == 0`                                  |
//! | `U`    | `s > posture_band`                                    |
//! | `L`    | `s < -posture_band`                                   |
//! | `R`    | `a > align_band`                                      |
//! | `F`    | `a < -align_band`                                     |
//! | `N`    | `|a| <= align_band && |s| <= posture_band`            |
//!
//! The table is complete for non-negative bands: a state that fails the first
//! five predicates satisfies the sixth. Predicates read only the current
//! state and its deltas, which are themselves window-local. A state that
//! matches nothing is a [`ConsistencyError`], never a default symbol.

use crate::error::{ConfigError, ConsistencyError};
use crate::structural::engine::StructuralState;

/// Alphabet definition version, echoed in the run profile.
pub const ALPHABET_VERSION: &str = "sbm.alphabet.v1";

/// One symbol of Σ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Quiescent,
    Upper,
    Lower,
    Rising,
    Falling,
    Neutral,
}

impl Symbol {
    /// Σ in declaration (priority) order.
    pub const ALL: [Self; 6] = [
        Self::Quiescent,
        Self::Upper,
        Self::Lower,
        Self::Rising,
        Self::Falling,
        Self::Neutral,
    ];

    /// Single-letter serialized form.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Quiescent => "Q",
            Self::Upper => "U",
            Self::Lower => "L",
            Self::Rising => "R",
            Self::Falling => "F",
            Self::Neutral => "N",
        }
    }

    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Position in [`Symbol::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Declared classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    align_band: i64,
    posture_band: i64,
}

impl Thresholds {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] for a negative band; a negative
    /// band would leave states with no matching predicate.
    pub fn new(align_band: i64, posture_band: i64) -> Result<Self, ConfigError> {
        for (name, value) in [("align_band", align_band), ("posture_band", posture_band)] {
            if value < 0 {
                return Err(ConfigError::InvalidParameter {
                    name: name.into(),
                    detail: format!("{value} is negative"),
                });
            }
        }
        Ok(Self {
            align_band,
            posture_band,
        })
    }

    #[must_use]
    pub fn align_band(&self) -> i64 {
        self.align_band
    }

    #[must_use]
    pub fn posture_band(&self) -> i64 {
        self.posture_band
    }
}

type Predicate = fn(&StructuralState, &Thresholds) -> bool;

/// Priority-ordered predicate table for `sbm.alphabet.v1`.
const TABLE_V1: [(Symbol, Predicate); 6] = [
    (Symbol::Quiescent, |st, _| st.d_a == 0 && st.d_s == 0),
    (Symbol::Upper, |st, th| st.s > th.posture_band),
    (Symbol::Lower, |st, th| st.s < -th.posture_band),
    (Symbol::Rising, |st, th| st.a > th.align_band),
    (Symbol::Falling, |st, th| st.a < -th.align_band),
    (Symbol::Neutral, |st, th| {
        st.a.abs() <= th.align_band && st.s.abs() <= th.posture_band
    }),
];

/// Maps each structural state to exactly one symbol.
#[derive(Debug, Clone)]
pub struct AlphabetAssigner {
    thresholds: Thresholds,
    table: Vec<(Symbol, Predicate)>,
}

impl AlphabetAssigner {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            table: TABLE_V1.to_vec(),
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Σ as declared; never grows during a run.
    #[must_use]
    pub fn alphabet(&self) -> &'static [Symbol] {
        &Symbol::ALL
    }

    /// Classify `state`: the first matching predicate wins.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::NoPredicateMatched`] if the table does not
    /// cover `state`.
    pub fn assign(&self, state: &StructuralState) -> Result<Symbol, ConsistencyError> {
        self.table
            .iter()
            .find(|(_, matches)| matches(state, &self.thresholds))
            .map(|(symbol, _)| *symbol)
            .ok_or(ConsistencyError::NoPredicateMatched {
                t: state.t,
                a: state.a,
                s: state.s,
                d_a: state.d_a,
                d_s: state.d_s,
            })
    }
}
