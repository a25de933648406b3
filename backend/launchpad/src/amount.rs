//! Exact fixed-point decimals for currency and token magnitudes.
//!
//! A [`Fixed<D>`] is a count of base units where one whole unit is `10^D`
//! base units. Values cross the API and storage boundaries as decimal
//! strings; binary floating point is never involved.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{LaunchpadError, Result};

/// Fractional digits of USD-denominated amounts (USDT / USDC).
pub const CURRENCY_DECIMALS: u32 = 6;
/// Fractional digits of project token quantities.
pub const TOKEN_DECIMALS: u32 = 18;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed<const D: u32>(u128);

/// Currency amount: prices, contribution limits, raised totals.
pub type Usd = Fixed<CURRENCY_DECIMALS>;
/// Token quantity: supply, sale cap, allocations.
pub type Tokens = Fixed<TOKEN_DECIMALS>;

impl<const D: u32> Fixed<D> {
    pub const ZERO: Self = Self(0);
    /// Base units per whole unit.
    pub const SCALE: u128 = 10u128.pow(D);

    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn units(self) -> u128 {
        self.0
    }

    pub fn from_whole(whole: u128) -> Option<Self> {
        whole.checked_mul(Self::SCALE).map(Self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl<const D: u32> FromStr for Fixed<D> {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LaunchpadError::validation(format!("invalid amount: {s:?}"));

        let (whole, frac) = match s.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > D as usize {
            return Err(LaunchpadError::validation(format!(
                "invalid amount: {s:?} has more than {D} decimal places"
            )));
        }

        let whole: u128 = whole.parse().map_err(|_| invalid())?;
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| invalid())?;
            digits * 10u128.pow(D - frac.len() as u32)
        };

        whole
            .checked_mul(Self::SCALE)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl<const D: u32> fmt::Display for Fixed<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = format!("{:0width$}", self.0 % Self::SCALE, width = D as usize);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "{whole}.0")
        } else {
            write!(f, "{whole}.{frac}")
        }
    }
}

impl<const D: u32> Serialize for Fixed<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, const D: u32> Deserialize<'de> for Fixed<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> std::result::Result<Self, De::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
