//! Withdrawal-Payout Solver
//!
//! Given a pool's accounting state and a pool-token amount being redeemed,
//! the solver splits the payout between the vault, the external-protection
//! reserve and freshly minted network tokens, and rebalances the trading
//! reserves so the pre-withdrawal price is preserved.

use crate::constants::PPM_RESOLUTION;
use crate::error::NetworkError;
use crate::math::{mul_div_ceil, mul_div_floor};

/// Everything the solver needs to know about the pool being redeemed from.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalInputs {
    /// Base-token trading liquidity (`b`)
    pub base_trading_liquidity: u128,
    /// Network-token trading liquidity (`n`)
    pub nt_trading_liquidity: u128,
    /// Staked balance (`s`)
    pub staked_balance: u128,
    /// Total pool-token supply
    pub pool_token_supply: u128,
    /// Pool tokens being redeemed
    pub pool_token_amount: u128,
    /// Base tokens held by the master vault
    pub vault_balance: u128,
    /// Base tokens held by the external-protection vault
    pub external_protection_balance: u128,
    /// Fee charged on the withdrawal
    pub withdrawal_fee_ppm: u32,
}

/// The solver's full payout breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalAmounts {
    /// Base tokens paid from the master vault
    pub base_from_vault: u128,
    /// Base tokens paid from the external-protection vault
    pub base_from_external_protection: u128,
    /// Network tokens minted to the provider to cover any remaining shortfall
    pub nt_to_provider: u128,
    /// Base-token value of the withdrawal fee (stays in the vault)
    pub base_fee: u128,
    /// Base trading liquidity after rebalancing
    pub new_base_trading_liquidity: u128,
    /// Network-token trading liquidity after rebalancing
    pub new_nt_trading_liquidity: u128,
    /// Staked balance after the claim is removed
    pub new_staked_balance: u128,
    /// Network tokens leaving the trading liquidity, to be renounced
    pub nt_renounced: u128,
}

/// Solves the payout for redeeming `pool_token_amount` shares.
///
/// The provider receives the pro-rata share of the staked balance minus the
/// withdrawal fee, preferring base tokens from the vault, then the external
/// reserve, then network tokens minted at the current spot rate. Both trading
/// reserves shrink by the redeemed share so the spot price carries over.
pub fn withdrawal_amounts(i: &WithdrawalInputs) -> Result<WithdrawalAmounts, NetworkError> {
    if i.pool_token_amount == 0 {
        return Err(NetworkError::ZeroValue);
    }
    if i.pool_token_supply == 0 || i.pool_token_amount > i.pool_token_supply {
        return Err(NetworkError::InsufficientFunds {
            required: i.pool_token_amount,
            available: i.pool_token_supply,
        });
    }

    // the provider's claim on the staked balance, and the fee carved from it
    let claimed = mul_div_floor(i.pool_token_amount, i.staked_balance, i.pool_token_supply)?;
    let base_fee = mul_div_floor(claimed, i.withdrawal_fee_ppm as u128, PPM_RESOLUTION as u128)?;
    let target = claimed - base_fee;

    let base_from_vault = target.min(i.vault_balance);
    let shortfall = target - base_from_vault;
    let base_from_external_protection = shortfall.min(i.external_protection_balance);
    let uncovered = shortfall - base_from_external_protection;

    let nt_to_provider = if uncovered == 0 {
        0
    } else if i.base_trading_liquidity == 0 {
        // no spot rate to value the shortfall at
        return Err(NetworkError::InsufficientFunds {
            required: uncovered,
            available: 0,
        });
    } else {
        // compensation rounds in the provider's favor
        mul_div_ceil(uncovered, i.nt_trading_liquidity, i.base_trading_liquidity)?
    };

    // scale both reserves down by the redeemed share; rounding down on both
    // sides keeps the price within the deviation tolerance
    let base_removed = mul_div_floor(
        i.base_trading_liquidity,
        i.pool_token_amount,
        i.pool_token_supply,
    )?;
    let nt_removed = mul_div_floor(
        i.nt_trading_liquidity,
        i.pool_token_amount,
        i.pool_token_supply,
    )?;

    Ok(WithdrawalAmounts {
        base_from_vault,
        base_from_external_protection,
        nt_to_provider,
        base_fee,
        new_base_trading_liquidity: i.base_trading_liquidity - base_removed,
        new_nt_trading_liquidity: i.nt_trading_liquidity - nt_removed,
        new_staked_balance: i.staked_balance - claimed,
        nt_renounced: nt_removed,
    })
}
