//! The registered operator families.
//!
//! | id                | magnitude                                                 |
//! |-------------------|-----------------------------------------------------------|
//! | `digitsum_mod9`   | `digitsum_base(t + offset) mod modulus`                   |
//! | `xorshift_parity` | low bit of a xorshift32 register seeded with `seed`       |
//! | `collatz_parity`  | low bit of the Collatz trajectory from `seed`             |
//! | `lcg_xor_parity`  | observed bit of `(x_{t-1}, x_t)` for a (shiftable) LCG    |
//! | `sha1_parity`     | low bit of a 32-bit register iterated through SHA-1       |
//! | `ssnt_closure`    | smallest-divisor band and hardness bucket of `t + offset` |
//!
//! Register-style families emit `m(t)` from state `x_{t-1}` with `x_0 = seed`.

use sha1::{Digest, Sha1};

use super::{Operator, OperatorParams, ParamValue};
use crate::error::ConfigError;

pub const DIGITSUM_MOD9: &str = "digitsum_mod9";
pub const XORSHIFT_PARITY: &str = "xorshift_parity";
pub const COLLATZ_PARITY: &str = "collatz_parity";
pub const LCG_XOR_PARITY: &str = "lcg_xor_parity";
pub const SHA1_PARITY: &str = "sha1_parity";
pub const SSNT_CLOSURE: &str = "ssnt_closure";

/// Step rules accepted by `pre_mode` / `post_mode`.
pub const LCG_STREAM_MODES: &[&str] = &["lcg", "plateau", "ramp"];
/// Observations accepted by `obs`.
pub const LCG_OBS_MODES: &[&str] = &["delta_parity", "popcnt_parity", "x_lsb", "xor_parity"];

const LOW_32: u128 = 0xFFFF_FFFF;

fn missing(name: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name: name.to_string(),
        detail: "missing after resolution".into(),
    }
}

/// Read a resolved integer parameter. Resolution guarantees presence and
/// kind; a violation is still reported as a configuration error rather than
/// a panic.
pub(crate) fn param(params: &OperatorParams, name: &str) -> Result<u64, ConfigError> {
    params
        .get(name)
        .and_then(ParamValue::as_int)
        .ok_or_else(|| missing(name))
}

/// Read a resolved choice parameter.
pub(crate) fn choice<'a>(params: &'a OperatorParams, name: &str) -> Result<&'a str, ConfigError> {
    params
        .get(name)
        .and_then(ParamValue::as_name)
        .ok_or_else(|| missing(name))
}

fn int_params<const N: usize>(pairs: [(&str, u64); N]) -> OperatorParams {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), ParamValue::Int(v)))
        .collect()
}

// ---------------------------------------------------------------------------
// digitsum_mod9
// ---------------------------------------------------------------------------

/// Digit-sum residue generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitSumResidue {
    base: u64,
    modulus: u64,
    offset: u64,
}

impl DigitSumResidue {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if a declared parameter is absent.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        Ok(Self {
            base: param(params, "base")?,
            modulus: param(params, "modulus")?,
            offset: param(params, "offset")?,
        })
    }

    fn value(&self, t: u64) -> u64 {
        let mut x = u128::from(t) + u128::from(self.offset);
        let base = u128::from(self.base);
        let mut sum: u128 = 0;
        while x > 0 {
            sum += x % base;
            x /= base;
        }
        // sum < 128 * base fits easily; the residue is < modulus.
        u64::try_from(sum % u128::from(self.modulus)).unwrap_or(0)
    }
}

impl Operator for DigitSumResidue {
    fn id(&self) -> &'static str {
        DIGITSUM_MOD9
    }

    fn params(&self) -> OperatorParams {
        int_params([
            ("base", self.base),
            ("modulus", self.modulus),
            ("offset", self.offset),
        ])
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        Box::new((1..).map(move |t| self.value(t)))
    }

    fn magnitude_at(&self, t: u64) -> Option<u64> {
        (t >= 1).then(|| self.value(t))
    }
}

// ---------------------------------------------------------------------------
// xorshift_parity
// ---------------------------------------------------------------------------

/// Fixed-seed xorshift32 shift-register parity generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorshiftParity {
    seed: u32,
}

impl XorshiftParity {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if `seed` is absent or does not
    /// fit the 32-bit register.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        let seed = param(params, "seed")?;
        let seed = u32::try_from(seed).map_err(|_| ConfigError::InvalidParameter {
            name: "seed".into(),
            detail: format!("{seed} does not fit a 32-bit register"),
        })?;
        Ok(Self { seed })
    }
}

/// One xorshift32 step (Marsaglia 13/17/5).
#[must_use]
pub fn xorshift32(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

impl Operator for XorshiftParity {
    fn id(&self) -> &'static str {
        XORSHIFT_PARITY
    }

    fn params(&self) -> OperatorParams {
        int_params([("seed", u64::from(self.seed))])
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        Box::new(
            std::iter::successors(Some(self.seed), |&x| Some(xorshift32(x)))
                .map(|x| u64::from(x & 1)),
        )
    }
}

// ---------------------------------------------------------------------------
// collatz_parity
// ---------------------------------------------------------------------------

/// Parity of the Collatz trajectory (wrapping `u64` arithmetic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollatzParity {
    seed: u64,
}

impl CollatzParity {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if `seed` is absent.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        Ok(Self {
            seed: param(params, "seed")?,
        })
    }
}

/// One Collatz step with wrapping arithmetic.
#[must_use]
pub fn collatz_step(x: u64) -> u64 {
    if x & 1 == 0 {
        x / 2
    } else {
        x.wrapping_mul(3).wrapping_add(1)
    }
}

impl Operator for CollatzParity {
    fn id(&self) -> &'static str {
        COLLATZ_PARITY
    }

    fn params(&self) -> OperatorParams {
        int_params([("seed", self.seed)])
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        Box::new(std::iter::successors(Some(self.seed), |&x| Some(collatz_step(x))).map(|x| x & 1))
    }
}

// ---------------------------------------------------------------------------
// lcg_xor_parity
// ---------------------------------------------------------------------------

/// How one register step advances `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// `x ← (a·x + c) mod M`.
    Lcg,
    /// `x ← x`.
    Plateau,
    /// `x ← (x + k + 1) mod M` at step index `k`.
    Ramp,
}

impl StreamMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Lcg => "lcg",
            Self::Plateau => "plateau",
            Self::Ramp => "ramp",
        }
    }

    fn parse(name: &str, field: &str) -> Result<Self, ConfigError> {
        match name {
            "lcg" => Ok(Self::Lcg),
            "plateau" => Ok(Self::Plateau),
            "ramp" => Ok(Self::Ramp),
            other => Err(ConfigError::InvalidParameter {
                name: field.to_string(),
                detail: format!("unknown stream mode {other}"),
            }),
        }
    }
}

/// Which bit of a transition `(x_{t-1}, x_t)` becomes `m(t)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsMode {
    /// `((x_t − x_{t-1}) mod M) & 1`.
    DeltaParity,
    /// `(x_{t-1} ⊕ x_t) & 1`.
    XorParity,
    /// `x_{t-1} & 1`.
    XLsb,
    /// Parity of `popcount((x_{t-1} ⊕ x_t) & 0xFFFF_FFFF)`.
    PopcntParity,
}

impl ObsMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DeltaParity => "delta_parity",
            Self::XorParity => "xor_parity",
            Self::XLsb => "x_lsb",
            Self::PopcntParity => "popcnt_parity",
        }
    }

    fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "delta_parity" => Ok(Self::DeltaParity),
            "xor_parity" => Ok(Self::XorParity),
            "x_lsb" => Ok(Self::XLsb),
            "popcnt_parity" => Ok(Self::PopcntParity),
            other => Err(ConfigError::InvalidParameter {
                name: "obs".into(),
                detail: format!("unknown observation {other}"),
            }),
        }
    }

    /// Both states are already reduced mod `modulus`.
    fn bit(self, prev: u128, next: u128, modulus: u128) -> u64 {
        let bit = match self {
            Self::DeltaParity => ((next + modulus - prev) % modulus) & 1,
            Self::XorParity => (prev ^ next) & 1,
            Self::XLsb => prev & 1,
            Self::PopcntParity => u128::from(((prev ^ next) & LOW_32).count_ones() & 1),
        };
        u64::from(bit == 1)
    }
}

/// Linear congruential stream with an optional regime shift, observed
/// through one bit per transition.
///
/// Step `k` (producing `x_{k+1}`) runs the pre-shift regime `(pre_mode, a, c)`
/// while `k < shift_n` and the post-shift regime `(post_mode, a2, c2)` after.
/// `shift_n = 0` disables the shift: every step runs the pre-shift regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcgXorParity {
    seed: u64,
    a: u64,
    c: u64,
    a2: u64,
    c2: u64,
    modulus: u64,
    shift_n: u64,
    pre_mode: StreamMode,
    post_mode: StreamMode,
    obs: ObsMode,
}

impl LcgXorParity {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if a declared parameter is
    /// absent or names an unknown mode.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        Ok(Self {
            seed: param(params, "seed")?,
            a: param(params, "a")?,
            c: param(params, "c")?,
            a2: param(params, "a2")?,
            c2: param(params, "c2")?,
            modulus: param(params, "modulus")?,
            shift_n: param(params, "shift_n")?,
            pre_mode: StreamMode::parse(choice(params, "pre_mode")?, "pre_mode")?,
            post_mode: StreamMode::parse(choice(params, "post_mode")?, "post_mode")?,
            obs: ObsMode::parse(choice(params, "obs")?)?,
        })
    }

    fn step(&self, x: u128, k: u64) -> u128 {
        let modulus = u128::from(self.modulus);
        let (mode, a, c) = if self.shift_n == 0 || k < self.shift_n {
            (self.pre_mode, self.a, self.c)
        } else {
            (self.post_mode, self.a2, self.c2)
        };
        match mode {
            StreamMode::Lcg => (u128::from(a) * x + u128::from(c)) % modulus,
            StreamMode::Plateau => x,
            StreamMode::Ramp => (x + u128::from(k) + 1) % modulus,
        }
    }
}

impl Operator for LcgXorParity {
    fn id(&self) -> &'static str {
        LCG_XOR_PARITY
    }

    fn params(&self) -> OperatorParams {
        let mut params = int_params([
            ("a", self.a),
            ("a2", self.a2),
            ("c", self.c),
            ("c2", self.c2),
            ("modulus", self.modulus),
            ("seed", self.seed),
            ("shift_n", self.shift_n),
        ]);
        params.insert("obs".into(), self.obs.name().into());
        params.insert("pre_mode".into(), self.pre_mode.name().into());
        params.insert("post_mode".into(), self.post_mode.name().into());
        params
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        let modulus = u128::from(self.modulus);
        let x0 = u128::from(self.seed) % modulus;
        Box::new((0u64..).scan(x0, move |x, k| {
            let prev = *x;
            let next = self.step(prev, k);
            *x = next;
            Some(self.obs.bit(prev, next, modulus))
        }))
    }

    fn regime_shift(&self) -> Option<u64> {
        (self.shift_n > 0).then_some(self.shift_n.saturating_add(1))
    }
}

// ---------------------------------------------------------------------------
// sha1_parity
// ---------------------------------------------------------------------------

/// 32-bit register replaced each step by the first four big-endian bytes of
/// the SHA-1 digest of its big-endian encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha1Parity {
    seed: u32,
}

impl Sha1Parity {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if `seed` is absent or does not
    /// fit the 32-bit register.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        let seed = param(params, "seed")?;
        let seed = u32::try_from(seed).map_err(|_| ConfigError::InvalidParameter {
            name: "seed".into(),
            detail: format!("{seed} does not fit a 32-bit register"),
        })?;
        Ok(Self { seed })
    }
}

/// One SHA-1 register step.
#[must_use]
pub fn sha1_step(x: u32) -> u32 {
    let digest = Sha1::digest(x.to_be_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

impl Operator for Sha1Parity {
    fn id(&self) -> &'static str {
        SHA1_PARITY
    }

    fn params(&self) -> OperatorParams {
        int_params([("seed", u64::from(self.seed))])
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        Box::new(
            std::iter::successors(Some(self.seed), |&x| Some(sha1_step(x)))
                .map(|x| u64::from(x & 1)),
        )
    }
}

// ---------------------------------------------------------------------------
// ssnt_closure
// ---------------------------------------------------------------------------

/// Smallest nontrivial divisor of `n`, or 0 when `n` is prime.
///
/// `n < 2` has no primality; it reports 2 like an even composite.
#[must_use]
pub fn d_min(n: u64) -> u64 {
    if n <= 3 {
        return if n >= 2 { 0 } else { 2 };
    }
    let root = isqrt(u128::from(n));
    (2u64..)
        .take_while(|&d| u128::from(d) <= root)
        .find(|d| n % d == 0)
        .unwrap_or(0)
}

/// Floor square root.
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Divisor bands `P, A, B, C, D, E` as indices `0..=5`, with hardness
/// `d / √n` quantized into `buckets` equal slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsntClosure {
    offset: u64,
    bands: [u64; 4],
    buckets: u64,
}

impl SsntClosure {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if a declared parameter is
    /// absent or the band thresholds `t1..t4` decrease.
    pub fn from_params(params: &OperatorParams) -> Result<Self, ConfigError> {
        let bands = [
            param(params, "t1")?,
            param(params, "t2")?,
            param(params, "t3")?,
            param(params, "t4")?,
        ];
        if let Some(i) = bands.windows(2).position(|w| w[0] > w[1]) {
            return Err(ConfigError::InvalidParameter {
                name: format!("t{}", i + 2),
                detail: format!("band thresholds must not decrease ({bands:?})"),
            });
        }
        Ok(Self {
            offset: param(params, "offset")?,
            bands,
            buckets: param(params, "buckets")?,
        })
    }

    fn band(&self, d: u64) -> u64 {
        if d == 0 {
            return 0;
        }
        self.bands
            .iter()
            .zip(1u64..)
            .find(|&(&threshold, _)| d <= threshold)
            .map_or(5, |(_, band)| band)
    }

    /// `⌈buckets · d / √n⌉ − 1`, clamped to `[0, buckets − 1]`.
    fn bucket(&self, d: u64, n: u64) -> u64 {
        if d == 0 || self.buckets <= 1 || n == 0 {
            return 0;
        }
        let k = u128::from(self.buckets);
        let scaled = k * k * u128::from(d) * u128::from(d);
        let mut slot = isqrt(scaled / u128::from(n));
        if slot > 0 && slot * slot * u128::from(n) == scaled {
            slot -= 1;
        }
        u64::try_from(slot.min(k - 1)).unwrap_or(0)
    }

    fn value(&self, t: u64) -> u64 {
        let n = t.saturating_add(self.offset);
        let d = d_min(n);
        self.band(d) * self.buckets + self.bucket(d, n)
    }
}

impl Operator for SsntClosure {
    fn id(&self) -> &'static str {
        SSNT_CLOSURE
    }

    fn params(&self) -> OperatorParams {
        int_params([
            ("buckets", self.buckets),
            ("offset", self.offset),
            ("t1", self.bands[0]),
            ("t2", self.bands[1]),
            ("t3", self.bands[2]),
            ("t4", self.bands[3]),
        ])
    }

    fn magnitudes(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        Box::new((1..).map(move |t| self.value(t)))
    }

    fn magnitude_at(&self, t: u64) -> Option<u64> {
        (t >= 1).then(|| self.value(t))
    }
}
