//! Streaming aggregate metrics over the symbol sequence.
//!
//! [`MetricsAccumulator`] observes one symbol per tick and keeps O(|Σ|) state
//! plus one entry per checkpoint, so metrics never require the full sequence
//! in memory. Every ratio is an exact rational rendered by [`fixed12`]; no
//! floating point is involved, which keeps `sbm_metrics.csv` byte-stable
//! across platforms.
//!
//! An *emergence* is the first occurrence of a symbol. Gaps are the tick
//! distances between consecutive emergences; `mean_gap` and `var_gap`
//! (population variance) are `0` with fewer than two emergences.
//!
//! Fracture rows track the per-tick emergence indicator `Δα(t) ∈ {0, 1}`: a
//! *stable run* is a stretch of ticks with no emergence, and an emergence
//! that ends a stable run of at least `long_stable` ticks is a *fracture
//! candidate*. When the operator declares a regime shift at tick `s`, the
//! distinct count is also reported at `s − 1`, `s` and `N`.

use crate::alphabet::Symbol;

/// Ticks at which the distinct-symbol count is recorded, in addition to `N`.
pub const CHECKPOINTS: [u64; 10] = [
    100, 200, 500, 1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000,
];

/// Stable-run length that qualifies an emergence as a fracture candidate.
pub const DEFAULT_LONG_STABLE: u64 = 2_000;

const SCALE: u128 = 1_000_000_000_000;

/// Render `num / den` with exactly 12 decimals, truncated toward zero.
/// A zero denominator renders as zero.
#[must_use]
pub fn fixed12(num: u128, den: u128) -> String {
    if den == 0 {
        return "0.000000000000".to_string();
    }
    let whole = num / den;
    let frac = (num % den) * SCALE / den;
    format!("{whole}.{frac:012}")
}

/// Checkpoint ticks for a run of length `n`: [`CHECKPOINTS`] ∩ `[1, n]`, then `n`.
#[must_use]
pub fn checkpoints_for(n: u64) -> Vec<u64> {
    let mut points: Vec<u64> = CHECKPOINTS.iter().copied().filter(|&c| c <= n).collect();
    if n >= 1 && points.last() != Some(&n) {
        points.push(n);
    }
    points
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SymbolStats {
    count: u64,
    first: u64,
    last: u64,
}

/// Incremental metrics for one run.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    horizon: usize,
    ticks: u64,
    per_symbol: [SymbolStats; Symbol::ALL.len()],
    /// Emergence ticks; at most |Σ| entries.
    emergences: Vec<u64>,
    previous: Option<Symbol>,
    symbol_changes: u64,
    run_len: u64,
    max_run: u64,
    max_run_end: u64,
    pending_checkpoints: std::collections::VecDeque<u64>,
    distinct_at: Vec<(u64, u64)>,
    fracture: Fracture,
}

#[derive(Debug, Clone, Default)]
struct Fracture {
    long_stable: u64,
    shift_t: Option<u64>,
    stable_run: u64,
    max_stable_run: u64,
    max_spike: u64,
    spike_at: u64,
    candidates: u64,
    first_candidate: u64,
    alpha_before_shift: u64,
    alpha_at_shift: u64,
}

impl Fracture {
    fn observe(&mut self, t: u64, emerged: bool, distinct: u64) {
        if emerged {
            // At most one symbol emerges per tick, so the first spike is the largest.
            if self.max_spike == 0 {
                self.max_spike = 1;
                self.spike_at = t;
            }
            if self.stable_run >= self.long_stable {
                if self.candidates == 0 {
                    self.first_candidate = t;
                }
                self.candidates += 1;
            }
            self.stable_run = 0;
        } else {
            self.stable_run += 1;
            self.max_stable_run = self.max_stable_run.max(self.stable_run);
        }

        if let Some(shift) = self.shift_t {
            if t + 1 == shift {
                self.alpha_before_shift = distinct;
            }
            if t == shift {
                self.alpha_at_shift = distinct;
            }
        }
    }
}

impl MetricsAccumulator {
    /// `n` is the declared sequence length; it fixes the checkpoint set.
    #[must_use]
    pub fn new(n: u64, horizon: usize) -> Self {
        Self {
            horizon,
            ticks: 0,
            per_symbol: [SymbolStats::default(); Symbol::ALL.len()],
            emergences: Vec::with_capacity(Symbol::ALL.len()),
            previous: None,
            symbol_changes: 0,
            run_len: 0,
            max_run: 0,
            max_run_end: 0,
            pending_checkpoints: checkpoints_for(n).into(),
            distinct_at: Vec::new(),
            fracture: Fracture {
                long_stable: DEFAULT_LONG_STABLE,
                ..Fracture::default()
            },
        }
    }

    /// Set the fracture threshold and the operator's regime-shift tick.
    #[must_use]
    pub fn with_fracture(mut self, long_stable: u64, shift_t: Option<u64>) -> Self {
        self.fracture.long_stable = long_stable;
        self.fracture.shift_t = shift_t;
        self
    }

    /// Record the symbol assigned at tick `t`. Ticks must arrive in order.
    pub fn observe(&mut self, t: u64, symbol: Symbol) {
        self.ticks = t;

        let stats = &mut self.per_symbol[symbol.index()];
        let emerged = stats.count == 0;
        if emerged {
            stats.first = t;
            self.emergences.push(t);
        }
        stats.count += 1;
        stats.last = t;

        if self.previous == Some(symbol) {
            self.run_len += 1;
        } else {
            if self.previous.is_some() {
                self.symbol_changes += 1;
            }
            self.run_len = 1;
        }
        // Strict `>` keeps the earliest of equally long runs.
        if self.run_len > self.max_run {
            self.max_run = self.run_len;
            self.max_run_end = t;
        }
        self.previous = Some(symbol);

        let distinct = self.distinct();
        self.fracture.observe(t, emerged, distinct);

        if self.pending_checkpoints.front() == Some(&t) {
            self.pending_checkpoints.pop_front();
            self.distinct_at.push((t, self.distinct()));
        }
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of distinct symbols observed so far.
    #[must_use]
    pub fn distinct(&self) -> u64 {
        self.emergences.len() as u64
    }

    #[must_use]
    pub fn count(&self, symbol: Symbol) -> u64 {
        self.per_symbol[symbol.index()].count
    }

    /// First tick at which `symbol` occurred, `0` if never.
    #[must_use]
    pub fn first(&self, symbol: Symbol) -> u64 {
        self.per_symbol[symbol.index()].first
    }

    /// Last tick at which `symbol` occurred, `0` if never.
    #[must_use]
    pub fn last(&self, symbol: Symbol) -> u64 {
        self.per_symbol[symbol.index()].last
    }

    #[must_use]
    pub fn emergences(&self) -> &[u64] {
        &self.emergences
    }

    /// `(sum, sum of squares, count)` over emergence gaps.
    fn gap_sums(&self) -> (u128, u128, u128) {
        self.emergences
            .windows(2)
            .map(|w| u128::from(w[1] - w[0]))
            .fold((0, 0, 0), |(s, sq, k), g| (s + g, sq + g * g, k + 1))
    }

    /// Metric rows in fixed order, values already rendered.
    #[must_use]
    pub fn rows(&self) -> Vec<(String, String)> {
        let n = u128::from(self.ticks);
        let alphabet_size = Symbol::ALL.len() as u64;
        let ceiling = u128::from(alphabet_size).min(n);
        let distinct = self.distinct();
        let (gap_sum, gap_sq, gaps) = self.gap_sums();

        let mut rows: Vec<(String, String)> = vec![
            ("ticks".into(), self.ticks.to_string()),
            ("horizon".into(), self.horizon.to_string()),
            ("alphabet_size".into(), alphabet_size.to_string()),
            ("distinct_symbols".into(), distinct.to_string()),
            ("diversity_ratio".into(), fixed12(u128::from(distinct), ceiling)),
            ("emergence_count".into(), distinct.to_string()),
            (
                "last_emergence_t".into(),
                self.emergences.last().copied().unwrap_or(0).to_string(),
            ),
            ("emergence_rate".into(), fixed12(u128::from(distinct), n)),
            ("mean_gap".into(), fixed12(gap_sum, gaps)),
            // Population variance: (k·Σg² − (Σg)²) / k².
            (
                "var_gap".into(),
                fixed12(gaps * gap_sq - gap_sum * gap_sum, gaps * gaps),
            ),
            ("symbol_changes".into(), self.symbol_changes.to_string()),
            ("max_symbol_run".into(), self.max_run.to_string()),
            ("max_symbol_run_end".into(), self.max_run_end.to_string()),
        ];
        self.push_fracture_rows(&mut rows, distinct);

        for symbol in Symbol::ALL {
            let stats = self.per_symbol[symbol.index()];
            rows.push((format!("count_{symbol}"), stats.count.to_string()));
            rows.push((format!("first_{symbol}"), stats.first.to_string()));
            rows.push((format!("last_{symbol}"), stats.last.to_string()));
        }
        for (c, d) in &self.distinct_at {
            rows.push((format!("distinct_at_{c}"), d.to_string()));
        }
        rows
    }

    fn push_fracture_rows(&self, rows: &mut Vec<(String, String)>, distinct: u64) {
        let f = &self.fracture;
        let around_shift = |v: u64| if f.shift_t.is_some() { v } else { 0 };
        for (name, value) in [
            ("max_stable_run", f.max_stable_run),
            ("max_spike", f.max_spike),
            ("spike_at_t", f.spike_at),
            ("fracture_candidate_count", f.candidates),
            ("fracture_first_at_t", f.first_candidate),
            ("long_stable", f.long_stable),
            ("shift_t", f.shift_t.unwrap_or(0)),
            ("alpha_before_shift", around_shift(f.alpha_before_shift)),
            ("alpha_at_shift", around_shift(f.alpha_at_shift)),
            ("alpha_after", around_shift(distinct)),
        ] {
            rows.push((name.into(), value.to_string()));
        }
    }

    /// `metric,value` CSV, LF-terminated.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from("metric,value\n");
        for (name, value) in self.rows() {
            out.push_str(&name);
            out.push(',');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }
}
