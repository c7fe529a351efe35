//! Math Kernel
//!
//! All-integer fixed-point arithmetic for the liquidity network. Persisted
//! amounts are `u128`; every intermediate product is widened to 256 bits so
//! the final division is exact, the same discipline the constant-product and
//! rate calculations demand on-chain.

use primitive_types::U256;

use crate::constants::{MAX_RATE_FRACTION_BITS, PPM_RESOLUTION, RATE_AVERAGING_WINDOW};
use crate::error::NetworkError;
use crate::types::Fraction;

pub mod trade;
pub mod withdrawal;

pub use trade::{trade_output, TradeAmounts};
pub use withdrawal::{withdrawal_amounts, WithdrawalAmounts, WithdrawalInputs};

/// Computes `a * b / c` rounded down, without intermediate overflow.
///
/// Fails with `Overflow` when the result exceeds `u128::MAX` or `c` is zero.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, NetworkError> {
    if c == 0 {
        return Err(NetworkError::Overflow);
    }
    let result = (U256::from(a) * U256::from(b)) / U256::from(c);
    to_u128(result)
}

/// Computes `a * b / c` rounded up, without intermediate overflow.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, NetworkError> {
    if c == 0 {
        return Err(NetworkError::Overflow);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut result = product / divisor;
    if product % divisor != U256::zero() {
        result += U256::one();
    }
    to_u128(result)
}

/// Applies a parts-per-million factor to an amount, rounded down.
pub fn ppm_of(amount: u128, ppm: u32) -> Result<u128, NetworkError> {
    mul_div_floor(amount, ppm as u128, PPM_RESOLUTION as u128)
}

/// True when `spot` deviates from `average` by at most
/// `max_deviation_ppm / PPM` in either direction, relative to `average`.
///
/// Cross-multiplies in 512 bits; a missing rate on either side never
/// qualifies as stable.
pub fn within_deviation(spot: Fraction, average: Fraction, max_deviation_ppm: u32) -> bool {
    if spot.is_zero() || average.is_zero() {
        return false;
    }
    let x = U256::from(spot.n) * U256::from(average.d);
    let y = U256::from(average.n) * U256::from(spot.d);
    let diff = if x > y { x - y } else { y - x };
    diff.full_mul(U256::from(PPM_RESOLUTION)) <= y.full_mul(U256::from(max_deviation_ppm))
}

/// Folds the spot rate into the time-weighted average rate.
///
/// The average converges linearly onto the spot rate over
/// [`RATE_AVERAGING_WINDOW`] seconds; past the window the spot rate replaces
/// the average outright. The result is reduced to the bounded storage width.
pub fn updated_average_rate(average: Fraction, spot: Fraction, elapsed: u32) -> Fraction {
    if average.is_zero() || elapsed >= RATE_AVERAGING_WINDOW {
        return spot.normalized();
    }
    if elapsed == 0 || spot.is_zero() {
        return average;
    }
    let average = average.normalized();
    let spot = spot.normalized();

    let window = U256::from(RATE_AVERAGING_WINDOW);
    let dt = U256::from(elapsed);
    let remaining = window - dt;

    // (avg * (W - dt) + spot * dt) / W, as a single cross-multiplied fraction
    let n = U256::from(average.n) * U256::from(spot.d) * remaining
        + U256::from(spot.n) * U256::from(average.d) * dt;
    let d = U256::from(average.d) * U256::from(spot.d) * window;
    fraction_from_u256(n, d)
}

/// Scales a 256-bit fraction down to the bounded `u128` storage width.
fn fraction_from_u256(n: U256, d: U256) -> Fraction {
    if n.is_zero() || d.is_zero() {
        return Fraction::ZERO;
    }
    let width = n.bits().max(d.bits()) as u32;
    let shift = width.saturating_sub(MAX_RATE_FRACTION_BITS) as usize;
    let n = (n >> shift).low_u128().max(1);
    let d = (d >> shift).low_u128().max(1);
    Fraction::new(n, d)
}

fn to_u128(value: U256) -> Result<u128, NetworkError> {
    if value > U256::from(u128::MAX) {
        return Err(NetworkError::Overflow);
    }
    Ok(value.low_u128())
}
