//! Constant-Product Trade Output
//!
//! Computes the output amount and fee for a single hop through a pool. The
//! fee is carved from the input amount, the output is priced on the net
//! input, and the full input (fee included) joins the source reserve. The
//! caller credits the fee to the staked balance named by the hop direction:
//! the base pool's for NT→base hops, the master pool's for base→NT hops.

use crate::constants::PPM_RESOLUTION;
use crate::error::NetworkError;
use crate::math::mul_div_floor;

/// The result of one constant-product hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeAmounts {
    /// Net amount sent to the trader, in target-token units
    pub amount_out: u128,
    /// Fee carved from the input amount, in source-token units
    pub fee_amount: u128,
    /// Source reserve after the hop (the full input joins it)
    pub new_source_liquidity: u128,
    /// Target reserve after the hop
    pub new_target_liquidity: u128,
}

/// Prices `amount_in` against the `x` (source) and `y` (target) reserves.
///
/// `fee = a·f/PPM`, `amount_out = y·(a − fee) / (x + a − fee)`,
/// `new_x = x + a`, `new_y = y − amount_out`, all rounded down. The output
/// is strictly below `y`, so the target reserve never drains completely.
pub fn trade_output(
    source_liquidity: u128,
    target_liquidity: u128,
    amount_in: u128,
    trading_fee_ppm: u32,
) -> Result<TradeAmounts, NetworkError> {
    if amount_in == 0 {
        return Err(NetworkError::ZeroValue);
    }
    if source_liquidity == 0 || target_liquidity == 0 {
        return Err(NetworkError::NetworkLiquidityDisabled);
    }

    let fee_amount = mul_div_floor(amount_in, trading_fee_ppm as u128, PPM_RESOLUTION as u128)?;
    let net_in = amount_in - fee_amount;
    let new_source = source_liquidity
        .checked_add(amount_in)
        .ok_or(NetworkError::Overflow)?;

    let amount_out = mul_div_floor(target_liquidity, net_in, new_source - fee_amount)?;

    Ok(TradeAmounts {
        amount_out,
        fee_amount,
        new_source_liquidity: new_source,
        new_target_liquidity: target_liquidity - amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fee_output_matches_raw_curve() {
        let t = trade_output(1_000_000, 2_000_000, 100_000, 0).unwrap();
        // 2_000_000 * 100_000 / 1_100_000 = 181_818
        assert_eq!(t.amount_out, 181_818);
        assert_eq!(t.fee_amount, 0);
        assert_eq!(t.new_source_liquidity, 1_100_000);
        assert_eq!(t.new_target_liquidity, 2_000_000 - 181_818);
    }

    #[test]
    fn fee_is_taken_from_the_input() {
        // 1% fee
        let t = trade_output(1_000_000, 2_000_000, 100_000, 10_000).unwrap();
        assert_eq!(t.fee_amount, 1_000); // 1% of the input
        // 2_000_000 * 99_000 / 1_099_000
        assert_eq!(t.amount_out, 180_163);
        // the full input, fee included, joins the source reserve
        assert_eq!(t.new_source_liquidity, 1_100_000);
        assert_eq!(t.new_target_liquidity, 2_000_000 - 180_163);
    }

    #[test]
    fn output_is_monotonic_in_input() {
        let mut last = 0;
        for amount_in in [1_000u128, 5_000, 25_000, 125_000, 625_000] {
            let t = trade_output(10_000_000, 20_000_000, amount_in, 2_000).unwrap();
            assert!(t.amount_out > last);
            last = t.amount_out;
        }
    }

    #[test]
    fn empty_reserves_and_zero_input_are_rejected() {
        assert_eq!(
            trade_output(0, 1, 1, 0),
            Err(NetworkError::NetworkLiquidityDisabled)
        );
        assert_eq!(
            trade_output(1, 0, 1, 0),
            Err(NetworkError::NetworkLiquidityDisabled)
        );
        assert_eq!(trade_output(1, 1, 0, 0), Err(NetworkError::ZeroValue));
    }
}
