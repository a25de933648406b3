//! Token allocation arithmetic.
//!
//! Every allocation in the system, whether recorded at contribution time or
//! recomputed when auditing totals, goes through [`tokens_allocated`].

use crate::amount::{Tokens, Usd};
use crate::errors::{LaunchpadError, Result};

/// Tokens owed for `amount` at `price_per_token`.
///
/// Computed as `amount * 10^18 / price` over base units. Division truncates
/// toward zero; a fractional base unit is never rounded up.
pub fn tokens_allocated(amount: Usd, price_per_token: Usd) -> Result<Tokens> {
    if price_per_token.is_zero() {
        return Err(LaunchpadError::validation("price per token must be positive"));
    }
    amount
        .units()
        .checked_mul(Tokens::SCALE)
        .map(|scaled| Tokens::from_units(scaled / price_per_token.units()))
        .ok_or_else(|| LaunchpadError::validation("contribution amount too large"))
}
