//! `TrailingWindow`: the last up-to-`H` magnitudes ending at the current tick.
//!
//! Holds the values plus running counters (odd values, rising pairs, falling
//! pairs) that are adjusted on every push and eviction, so alignment rules
//! read the window summary in O(1). Memory is O(H).
//!
//! For `t < H` the window holds exactly ticks `1..=t`; from `t ≥ H` on it holds
//! exactly `t-H+1..=t`.

use std::collections::VecDeque;

use crate::error::ConfigError;

/// Bounded trailing buffer of magnitudes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingWindow {
    horizon: usize,
    values: VecDeque<u64>,
    /// Tick of the newest value; 0 before the first push.
    last_tick: u64,
    odd: u64,
    rises: u64,
    falls: u64,
}

impl TrailingWindow {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHorizon`] if `horizon == 0`.
    pub fn new(horizon: usize) -> Result<Self, ConfigError> {
        if horizon == 0 {
            return Err(ConfigError::InvalidHorizon { h: horizon });
        }
        Ok(Self {
            horizon,
            values: VecDeque::with_capacity(horizon),
            last_tick: 0,
            odd: 0,
            rises: 0,
            falls: 0,
        })
    }

    /// Append the magnitude of the next tick, evicting the oldest value once
    /// the window would exceed `H`.
    pub fn push(&mut self, m: u64) {
        if self.values.len() == self.horizon {
            if let Some(evicted) = self.values.pop_front() {
                self.odd -= evicted & 1;
                if let Some(&next) = self.values.front() {
                    self.uncount_pair(evicted, next);
                }
            }
        }
        if let Some(&newest) = self.values.back() {
            self.count_pair(newest, m);
        }
        self.odd += m & 1;
        self.values.push_back(m);
        self.last_tick += 1;
    }

    fn count_pair(&mut self, earlier: u64, later: u64) {
        match later.cmp(&earlier) {
            std::cmp::Ordering::Greater => self.rises += 1,
            std::cmp::Ordering::Less => self.falls += 1,
            std::cmp::Ordering::Equal => {}
        }
    }

    fn uncount_pair(&mut self, earlier: u64, later: u64) {
        match later.cmp(&earlier) {
            std::cmp::Ordering::Greater => self.rises -= 1,
            std::cmp::Ordering::Less => self.falls -= 1,
            std::cmp::Ordering::Equal => {}
        }
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inclusive tick range currently covered, or `None` before the first push.
    #[must_use]
    pub fn span(&self) -> Option<(u64, u64)> {
        if self.values.is_empty() {
            return None;
        }
        let len = self.values.len() as u64;
        Some((self.last_tick + 1 - len, self.last_tick))
    }

    /// Values oldest first.
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn oldest(&self) -> Option<u64> {
        self.values.front().copied()
    }

    #[must_use]
    pub fn newest(&self) -> Option<u64> {
        self.values.back().copied()
    }

    #[must_use]
    pub fn odd_count(&self) -> u64 {
        self.odd
    }

    #[must_use]
    pub fn even_count(&self) -> u64 {
        self.values.len() as u64 - self.odd
    }

    /// Consecutive pairs inside the window with `later > earlier`.
    #[must_use]
    pub fn rises(&self) -> u64 {
        self.rises
    }

    /// Consecutive pairs inside the window with `later < earlier`.
    #[must_use]
    pub fn falls(&self) -> u64 {
        self.falls
    }
}
