//! Shared numeric helpers.
//!
//! Displayed readings are rounded the way the front end has always shown
//! them: one decimal place with halves rounded up, integer percentages with
//! halves rounded towards +∞. Non-finite inputs pass through untouched so a
//! degenerate footprint still reports NaN/∞ instead of a fabricated zero.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an f64 to 1 decimal place (halves away from zero).
pub(crate) fn round_1dp(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    match Decimal::from_f64(v) {
        Some(d) => dec_to_f64(d.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)),
        None => {
            tracing::warn!("round_1dp could not represent {} as Decimal", v);
            v
        }
    }
}

/// Round to the nearest integer, halves towards +∞.
pub(crate) fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
