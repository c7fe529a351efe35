//! Pool Collection
//!
//! The per-curve engine. A collection owns the [`Pool`] record for every base
//! token it services and implements the economic operations on them: deposit,
//! withdrawal, constant-product trading, trading enablement and migration.
//! Funds never move here — the facade moves value through the vaults and the
//! token ledger using the amounts a collection reports back.

use log::{debug, warn};

use std::collections::BTreeMap;

use crate::constants::DEFAULT_TRADING_FEE_PPM;
use crate::error::NetworkError;
use crate::master_pool::MasterPool;
use crate::math::{
    mul_div_floor, trade_output, updated_average_rate, within_deviation, withdrawal_amounts,
    WithdrawalAmounts, WithdrawalInputs,
};
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::state::{AverageRate, NetworkSettings, Pool};
use crate::token::TokenLedger;
use crate::types::{Address, Fraction};

/// Outcome of a base-token deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositResult {
    /// Pool tokens minted to the provider
    pub pool_token_amount: u128,
    /// Base tokens promoted into trading liquidity
    pub base_liquidity_added: u128,
    /// NT requested from the master pool to match them
    pub nt_liquidity_added: u128,
}

/// Outcome of a single trade hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeResult {
    /// Net amount owed to the trader, in target-token units
    pub amount_out: u128,
    /// Fee carved from the input amount, in source-token units
    pub fee_amount: u128,
    /// True when the fee accrues to the master pool (base→NT hops)
    pub fee_to_master_pool: bool,
}

/// Outcome of redeeming pool tokens against a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolWithdrawalResult {
    /// The solver's payout breakdown
    pub amounts: WithdrawalAmounts,
    /// True when the withdrawal pushed the pool out of trading
    pub trading_disabled: bool,
    /// Total NT to renounce from the master pool (rebalance plus any
    /// remainder released by a trading shutdown)
    pub nt_renounced_total: u128,
}

/// A registered set of pools sharing one curve implementation.
#[derive(Debug)]
pub struct PoolCollection {
    pool_type: u16,
    version: u16,
    default_trading_fee_ppm: u32,
    pools: BTreeMap<Address, Pool>,
}

impl PoolCollection {
    pub fn new(pool_type: u16, version: u16) -> Self {
        PoolCollection {
            pool_type,
            version,
            default_trading_fee_ppm: DEFAULT_TRADING_FEE_PPM,
            pools: BTreeMap::new(),
        }
    }

    pub fn pool_type(&self) -> u16 {
        self.pool_type
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn has_pool(&self, token: Address) -> bool {
        self.pools.contains_key(&token)
    }

    pub fn pool(&self, token: Address) -> Option<&Pool> {
        self.pools.get(&token)
    }

    pub fn pool_tokens(&self) -> impl Iterator<Item = Address> + '_ {
        self.pools.keys().copied()
    }

    /// Registers a pool for a whitelisted base token.
    pub fn create_pool(
        &mut self,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        token: Address,
    ) -> Result<PoolTokenId, NetworkError> {
        if token.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        if !settings.is_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        if self.pools.contains_key(&token) {
            return Err(NetworkError::AlreadyExists);
        }
        let pool_token = registry.create(token);
        let mut pool = Pool::new(pool_token);
        pool.trading_fee_ppm = self.default_trading_fee_ppm;
        self.pools.insert(token, pool);
        debug!("pool created for {token} (type {}, v{})", self.pool_type, self.version);
        Ok(pool_token)
    }

    pub fn set_trading_fee_ppm(&mut self, token: Address, fee_ppm: u32) -> Result<(), NetworkError> {
        if fee_ppm > crate::constants::PPM_RESOLUTION {
            return Err(NetworkError::InvalidFee { fee_ppm });
        }
        self.pool_mut(token)?.trading_fee_ppm = fee_ppm;
        Ok(())
    }

    pub fn set_depositing_enabled(
        &mut self,
        token: Address,
        enabled: bool,
    ) -> Result<(), NetworkError> {
        self.pool_mut(token)?.depositing_enabled = enabled;
        Ok(())
    }

    pub fn set_deposit_limit(&mut self, token: Address, limit: u128) -> Result<(), NetworkError> {
        self.pool_mut(token)?.deposit_limit = limit;
        Ok(())
    }

    /// Credits `amount` of staked value to the provider and, when trading is
    /// live, promotes a matching slice into trading liquidity.
    ///
    /// The base tokens themselves must already sit in the master vault; this
    /// method only adjusts accounting. A top-up that would exceed the funding
    /// limit is clamped; one that would break the rate-deviation bound is
    /// skipped entirely and trading stays enabled.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit(
        &mut self,
        registry: &mut PoolTokenRegistry,
        settings: &NetworkSettings,
        master_pool: &mut MasterPool,
        ledger: &mut TokenLedger,
        master_vault: Address,
        provider: Address,
        token: Address,
        amount: u128,
    ) -> Result<DepositResult, NetworkError> {
        if amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        // the whitelist gates deposits too: a de-whitelisted token keeps its
        // pool but stops accepting new value
        if !settings.is_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        if !pool.depositing_enabled {
            return Err(NetworkError::DepositingDisabled);
        }
        let new_staked = pool
            .staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        if new_staked > pool.deposit_limit {
            return Err(NetworkError::DepositLimitExceeded);
        }

        let supply = registry.total_supply(pool.pool_token);
        let pool_token_amount = if supply == 0 {
            amount
        } else {
            mul_div_floor(amount, supply, pool.staked_balance)?
        };
        if pool_token_amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        if supply.checked_add(pool_token_amount).is_none() {
            return Err(NetworkError::Overflow);
        }

        // size the NT top-up at the current spot rate, clamped to the
        // remaining funding headroom
        let mut base_delta = 0u128;
        let mut nt_delta = 0u128;
        if pool.trading_enabled && pool.base_trading_liquidity > 0 && pool.nt_trading_liquidity > 0
        {
            let desired_nt = mul_div_floor(
                amount,
                pool.nt_trading_liquidity,
                pool.base_trading_liquidity,
            )?;
            let clamped_nt = desired_nt.min(master_pool.available_funding(settings, token));
            if clamped_nt > 0 {
                let matched_base = mul_div_floor(
                    clamped_nt,
                    pool.base_trading_liquidity,
                    pool.nt_trading_liquidity,
                )?;
                let trial_nt = pool.nt_trading_liquidity.checked_add(clamped_nt);
                let trial_base = pool.base_trading_liquidity.checked_add(matched_base);
                match (trial_nt, trial_base) {
                    (Some(trial_nt), Some(trial_base))
                        if within_deviation(
                            Fraction::new(trial_nt, trial_base),
                            pool.average_rate.rate,
                            settings.avg_rate_max_deviation_ppm(),
                        ) =>
                    {
                        base_delta = matched_base;
                        nt_delta = clamped_nt;
                    }
                    _ => {
                        debug!("skipping NT top-up for {token}: deviation bound would be broken");
                    }
                }
            }
        }

        if nt_delta > 0 {
            let granted = master_pool.request_liquidity(
                ledger,
                settings,
                master_vault,
                token,
                nt_delta,
            )?;
            debug_assert_eq!(granted, nt_delta);
        }

        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        pool.staked_balance = new_staked;
        pool.base_trading_liquidity += base_delta;
        pool.nt_trading_liquidity += nt_delta;
        pool.refresh_product();
        registry.mint(pool.pool_token, provider, pool_token_amount)?;

        Ok(DepositResult {
            pool_token_amount,
            base_liquidity_added: base_delta,
            nt_liquidity_added: nt_delta,
        })
    }

    /// Redeems `pool_token_amount` custodied shares against the pool.
    ///
    /// Burns the shares, removes the claim from the staked balance and
    /// rebalances the trading reserves. When the remaining NT side falls
    /// under the trading floor, or the price cannot be preserved inside the
    /// deviation bound, trading shuts down and the rest of the pool's NT
    /// liquidity is reported for renouncement.
    pub fn withdraw(
        &mut self,
        registry: &mut PoolTokenRegistry,
        settings: &NetworkSettings,
        token: Address,
        custody: Address,
        pool_token_amount: u128,
        vault_balance: u128,
        external_protection_balance: u128,
    ) -> Result<PoolWithdrawalResult, NetworkError> {
        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        let custody_balance = registry.balance_of(pool.pool_token, custody);
        if custody_balance < pool_token_amount {
            return Err(NetworkError::InsufficientFunds {
                required: pool_token_amount,
                available: custody_balance,
            });
        }

        let amounts = withdrawal_amounts(&WithdrawalInputs {
            base_trading_liquidity: pool.base_trading_liquidity,
            nt_trading_liquidity: pool.nt_trading_liquidity,
            staked_balance: pool.staked_balance,
            pool_token_supply: registry.total_supply(pool.pool_token),
            pool_token_amount,
            vault_balance,
            external_protection_balance,
            withdrawal_fee_ppm: settings.withdrawal_fee_ppm(),
        })?;

        registry.burn(pool.pool_token, custody, pool_token_amount)?;
        pool.staked_balance = amounts.new_staked_balance;
        pool.base_trading_liquidity = amounts.new_base_trading_liquidity;
        pool.nt_trading_liquidity = amounts.new_nt_trading_liquidity;
        pool.refresh_product();

        let mut nt_renounced_total = amounts.nt_renounced;
        let mut trading_disabled = false;
        if pool.trading_enabled {
            let floor = settings.min_liquidity_for_trading();
            let price_preserved = within_deviation(
                pool.spot_rate(),
                pool.average_rate.rate,
                settings.avg_rate_max_deviation_ppm(),
            );
            if pool.nt_trading_liquidity < floor || !price_preserved {
                warn!("trading disabled for {token} after withdrawal");
                nt_renounced_total += pool.nt_trading_liquidity;
                pool.base_trading_liquidity = 0;
                pool.nt_trading_liquidity = 0;
                pool.average_rate = AverageRate::default();
                pool.trading_enabled = false;
                pool.refresh_product();
                trading_disabled = true;
            }
        }

        Ok(PoolWithdrawalResult { amounts, trading_disabled, nt_renounced_total })
    }

    /// Executes one constant-product hop through the pool.
    ///
    /// `from_nt` selects the direction: NT→base when true, base→NT when
    /// false. The average rate is folded forward before pricing; the
    /// post-trade spot must stay inside the deviation bound and the NT side
    /// must stay above the trading floor, otherwise the hop is rejected
    /// without touching state.
    pub fn trade(
        &mut self,
        settings: &NetworkSettings,
        token: Address,
        from_nt: bool,
        amount_in: u128,
        now: u32,
    ) -> Result<TradeResult, NetworkError> {
        if amount_in == 0 {
            return Err(NetworkError::ZeroValue);
        }
        if !settings.is_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        if !pool.trading_enabled {
            return Err(NetworkError::TradingDisabled);
        }

        // fold the reference rate forward; the cached reserve product is the
        // cheap probe for liquidity having moved under an unchanged timestamp
        let mut average_rate = pool.average_rate;
        if now > average_rate.time || pool.product_is_stale() {
            average_rate.rate = updated_average_rate(
                average_rate.rate,
                pool.spot_rate(),
                now.saturating_sub(average_rate.time),
            );
            average_rate.time = now;
        }

        let (source, target) = if from_nt {
            (pool.nt_trading_liquidity, pool.base_trading_liquidity)
        } else {
            (pool.base_trading_liquidity, pool.nt_trading_liquidity)
        };
        let hop = trade_output(source, target, amount_in, pool.trading_fee_ppm)?;

        let (new_base, new_nt) = if from_nt {
            (hop.new_target_liquidity, hop.new_source_liquidity)
        } else {
            (hop.new_source_liquidity, hop.new_target_liquidity)
        };

        let post_spot = Fraction::new(new_nt, new_base);
        if !within_deviation(post_spot, average_rate.rate, settings.avg_rate_max_deviation_ppm()) {
            return Err(NetworkError::RateUnstable);
        }
        if new_nt < settings.min_liquidity_for_trading() {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }

        let fee_to_master_pool = !from_nt;
        if !fee_to_master_pool {
            // an NT→base hop credits its fee to this pool's staked balance
            pool.staked_balance = pool
                .staked_balance
                .checked_add(hop.fee_amount)
                .ok_or(NetworkError::Overflow)?;
        }

        pool.base_trading_liquidity = new_base;
        pool.nt_trading_liquidity = new_nt;
        pool.average_rate = average_rate;
        pool.refresh_product();

        Ok(TradeResult {
            amount_out: hop.amount_out,
            fee_amount: hop.fee_amount,
            fee_to_master_pool,
        })
    }

    /// Seeds the trading reserves at the given virtual rate and opens trading.
    ///
    /// Bootstrap NT liquidity is the configured trading floor; the base side
    /// is derived from the virtual rate and must be covered by the staked
    /// balance. Returns `(nt_bootstrap, base_bootstrap)` so the caller can
    /// request the matching funding.
    pub fn enable_trading(
        &mut self,
        settings: &NetworkSettings,
        token: Address,
        nt_virtual_rate: u128,
        base_virtual_rate: u128,
        available_funding: u128,
        now: u32,
    ) -> Result<(u128, u128), NetworkError> {
        if nt_virtual_rate == 0 || base_virtual_rate == 0 {
            return Err(NetworkError::ZeroValue);
        }
        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        if pool.trading_enabled {
            return Err(NetworkError::AlreadyExists);
        }

        let nt_bootstrap = settings.min_liquidity_for_trading();
        if nt_bootstrap == 0 || available_funding < nt_bootstrap {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }
        let base_bootstrap = mul_div_floor(nt_bootstrap, base_virtual_rate, nt_virtual_rate)?;
        if base_bootstrap == 0 {
            return Err(NetworkError::ZeroValue);
        }
        if base_bootstrap > pool.staked_balance {
            return Err(NetworkError::InsufficientFunds {
                required: base_bootstrap,
                available: pool.staked_balance,
            });
        }

        pool.initial_rate = Fraction::new(nt_virtual_rate, base_virtual_rate);
        pool.base_trading_liquidity = base_bootstrap;
        pool.nt_trading_liquidity = nt_bootstrap;
        pool.average_rate = AverageRate { rate: pool.spot_rate().normalized(), time: now };
        pool.trading_enabled = true;
        pool.refresh_product();
        debug!("trading enabled for {token}: b={base_bootstrap} n={nt_bootstrap}");
        Ok((nt_bootstrap, base_bootstrap))
    }

    /// Shuts trading down and reports the NT liquidity to renounce.
    pub fn disable_trading(&mut self, token: Address) -> Result<u128, NetworkError> {
        let pool = self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)?;
        if !pool.trading_enabled {
            return Err(NetworkError::TradingDisabled);
        }
        let renounced = pool.nt_trading_liquidity;
        pool.base_trading_liquidity = 0;
        pool.nt_trading_liquidity = 0;
        pool.average_rate = AverageRate::default();
        pool.trading_enabled = false;
        pool.refresh_product();
        Ok(renounced)
    }

    /// Credits a base-denominated fee (flash loan) to the pool's staked
    /// balance.
    pub(crate) fn on_fees_collected(
        &mut self,
        token: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        let pool = self.pool_mut(token)?;
        pool.staked_balance = pool
            .staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        Ok(())
    }

    /// Puts a snapshotted pool record back, undoing a partially executed
    /// multi-hop route.
    pub(crate) fn restore_pool(&mut self, token: Address, pool: Pool) {
        self.pools.insert(token, pool);
    }

    /// Detaches a pool record for migration into a newer collection.
    pub fn migrate_out(&mut self, token: Address) -> Result<Pool, NetworkError> {
        self.pools.remove(&token).ok_or(NetworkError::InvalidPool)
    }

    /// Attaches a migrated pool record.
    pub fn migrate_in(&mut self, token: Address, pool: Pool) -> Result<(), NetworkError> {
        if self.pools.contains_key(&token) {
            return Err(NetworkError::AlreadyExists);
        }
        self.pools.insert(token, pool);
        Ok(())
    }

    /// Values `pool_token_amount` shares in reserve-token units.
    pub fn pool_token_to_underlying(
        &self,
        registry: &PoolTokenRegistry,
        token: Address,
        pool_token_amount: u128,
    ) -> Result<u128, NetworkError> {
        let pool = self.pools.get(&token).ok_or(NetworkError::DoesNotExist)?;
        let supply = registry.total_supply(pool.pool_token);
        if supply == 0 {
            return Ok(0);
        }
        mul_div_floor(pool_token_amount, pool.staked_balance, supply)
    }

    /// Values `amount` reserve tokens in shares at the current ratio.
    pub fn underlying_to_pool_token(
        &self,
        registry: &PoolTokenRegistry,
        token: Address,
        amount: u128,
    ) -> Result<u128, NetworkError> {
        let pool = self.pools.get(&token).ok_or(NetworkError::DoesNotExist)?;
        let supply = registry.total_supply(pool.pool_token);
        if supply == 0 {
            return Ok(amount);
        }
        mul_div_floor(amount, supply, pool.staked_balance)
    }

    fn pool_mut(&mut self, token: Address) -> Result<&mut Pool, NetworkError> {
        self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)
    }
}
