//! Token cost estimate recorded on every batch.

use rust_decimal::Decimal;

/// Flat blended price used for batch estimates.
pub const USD_PER_MILLION_TOKENS: i64 = 2;

/// `tokens / 1_000_000 * 2`, exact to six decimal places, trailing zeros
/// stripped.
#[must_use]
pub fn estimate_cost_usd(total_tokens: u64) -> Decimal {
    (Decimal::from(total_tokens) / Decimal::from(1_000_000_u64)
        * Decimal::from(USD_PER_MILLION_TOKENS))
    .normalize()
}
