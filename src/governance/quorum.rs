//! Quorum arithmetic.
//!
//! Quorum fractions are fixed-point values scaled by `WAD` (10^18), the same
//! precision the bond token uses, so `0.51` is stored as `510_000_000_000_000_000`.
//! The number of "for" votes a proposal needs is
//! `ceil(member_count × fraction)`, computed in `u128` with no floating point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed-point scale (18 decimal places).
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Highest admissible quorum (90%).
pub const MAX_QUORUM: Fraction = Fraction(900_000_000_000_000_000);

/// A fraction in `[0, 1]` with 18 decimal places.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fraction(u128);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FractionError {
    #[error("invalid fraction '{0}'")]
    Malformed(String),

    #[error("fraction '{0}' has more than 18 decimal places")]
    TooPrecise(String),

    #[error("fraction '{0}' is greater than 1")]
    AboveOne(String),
}

impl Fraction {
    pub const ZERO: Fraction = Fraction(0);
    pub const ONE: Fraction = Fraction(WAD);

    /// Build from a WAD-scaled value. Values above `WAD` are rejected.
    pub fn from_wad(wad: u128) -> Result<Self, FractionError> {
        if wad > WAD {
            return Err(FractionError::AboveOne(wad.to_string()));
        }
        Ok(Self(wad))
    }

    /// Build from basis points (`5100` = 51%).
    pub fn from_bps(bps: u16) -> Result<Self, FractionError> {
        Self::from_wad(bps as u128 * (WAD / 10_000))
    }

    pub fn as_wad(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Fraction {
    type Err = FractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        let digits_ok = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_ok(whole) || !digits_ok(frac) {
            return Err(FractionError::Malformed(s.to_string()));
        }
        if frac.len() > 18 {
            return Err(FractionError::TooPrecise(s.to_string()));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| FractionError::Malformed(s.to_string()))?
        };
        let frac_scaled: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<18}", frac);
            padded
                .parse()
                .map_err(|_| FractionError::Malformed(s.to_string()))?
        };

        let wad = whole
            .checked_mul(WAD)
            .and_then(|w| w.checked_add(frac_scaled))
            .ok_or_else(|| FractionError::AboveOne(s.to_string()))?;
        Self::from_wad(wad).map_err(|_| FractionError::AboveOne(s.to_string()))
    }
}

impl TryFrom<String> for Fraction {
    type Error = FractionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fraction> for String {
    fn from(fraction: Fraction) -> Self {
        fraction.to_string()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WAD;
        let frac = self.0 % WAD;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac_str = format!("{:018}", frac);
        write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({})", self)
    }
}

/// Votes required for a proposal to succeed: `ceil(member_count × quorum)`.
///
/// Pure and deterministic; re-evaluated on every vote and query against the
/// live member count.
pub fn votes_required(member_count: u64, quorum: Fraction) -> u64 {
    let scaled = member_count as u128 * quorum.as_wad();
    let votes = scaled.div_ceil(WAD);
    // quorum <= 1, so votes <= member_count and always fits in u64
    votes as u64
}

/// Whether `fraction` is an admissible quorum setting: `(0, 0.90]`.
pub fn is_admissible_quorum(fraction: Fraction) -> bool {
    !fraction.is_zero() && fraction <= MAX_QUORUM
}
