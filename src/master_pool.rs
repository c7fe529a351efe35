//! Master Pool
//!
//! The network-token side accountant. It is the only component that mints or
//! burns NT: trading liquidity is minted into the master vault against each
//! pool's funding limit and renounced back out of it, and NT providers
//! deposit by burning NT for pool tokens plus the matching governance
//! (voting) tokens.

use std::collections::BTreeMap;

use log::debug;

use crate::constants::PPM_RESOLUTION;
use crate::error::NetworkError;
use crate::math::mul_div_floor;
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::state::NetworkSettings;
use crate::token::TokenLedger;
use crate::types::Address;

/// Payout breakdown of an NT withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterWithdrawalAmounts {
    /// NT minted to the provider
    pub nt_amount: u128,
    /// NT value of the withdrawal fee
    pub withdrawal_fee: u128,
}

/// NT staking and funding state.
#[derive(Debug)]
pub struct MasterPool {
    nt_token: Address,
    gov_token: Address,
    pool_token: PoolTokenId,
    nt_staked_balance: u128,
    minted_per_pool: BTreeMap<Address, u128>,
}

impl MasterPool {
    pub fn new(registry: &mut PoolTokenRegistry, nt_token: Address, gov_token: Address) -> Self {
        let pool_token = registry.create(nt_token);
        MasterPool {
            nt_token,
            gov_token,
            pool_token,
            nt_staked_balance: 0,
            minted_per_pool: BTreeMap::new(),
        }
    }

    pub fn nt_token(&self) -> Address {
        self.nt_token
    }

    pub fn gov_token(&self) -> Address {
        self.gov_token
    }

    pub fn pool_token(&self) -> PoolTokenId {
        self.pool_token
    }

    pub fn nt_staked_balance(&self) -> u128 {
        self.nt_staked_balance
    }

    /// NT currently minted into `token`'s trading liquidity.
    pub fn minted_for(&self, token: Address) -> u128 {
        self.minted_per_pool.get(&token).copied().unwrap_or(0)
    }

    /// Funding headroom left under `token`'s limit.
    pub fn available_funding(&self, settings: &NetworkSettings, token: Address) -> u128 {
        settings.funding_limit(token).saturating_sub(self.minted_for(token))
    }

    /// Mints up to `amount` NT into the master vault for `token`'s trading
    /// liquidity, bounded by the remaining funding headroom. Returns the
    /// amount actually granted.
    pub fn request_liquidity(
        &mut self,
        ledger: &mut TokenLedger,
        settings: &NetworkSettings,
        master_vault: Address,
        token: Address,
        amount: u128,
    ) -> Result<u128, NetworkError> {
        let granted = amount.min(self.available_funding(settings, token));
        if granted == 0 {
            return Ok(0);
        }
        ledger.mint(self.nt_token, master_vault, granted)?;
        *self.minted_per_pool.entry(token).or_insert(0) += granted;
        debug!("funded {granted} NT into pool {token}");
        Ok(granted)
    }

    /// Burns NT trading liquidity back out of the master vault and releases
    /// the funding it occupied.
    pub fn renounce_liquidity(
        &mut self,
        ledger: &mut TokenLedger,
        master_vault: Address,
        token: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        let burned = amount.min(self.minted_for(token));
        if burned == 0 {
            return Ok(());
        }
        ledger.burn(self.nt_token, master_vault, burned)?;
        *self.minted_per_pool.entry(token).or_insert(0) -= burned;
        debug!("renounced {burned} NT from pool {token}");
        Ok(())
    }

    /// Stakes `amount` NT for `provider`: the payer's NT is burned and pool
    /// tokens plus an equal amount of governance tokens are issued against it.
    pub fn deposit(
        &mut self,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        payer: Address,
        provider: Address,
        amount: u128,
    ) -> Result<(u128, u128), NetworkError> {
        if amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        let supply = registry.total_supply(self.pool_token);
        let pool_token_amount = if supply == 0 {
            amount
        } else {
            mul_div_floor(amount, supply, self.nt_staked_balance)?
        };
        if pool_token_amount == 0 {
            return Err(NetworkError::ZeroValue);
        }

        ledger.burn(self.nt_token, payer, amount)?;
        registry.mint(self.pool_token, provider, pool_token_amount)?;
        ledger.mint(self.gov_token, provider, pool_token_amount)?;
        self.nt_staked_balance = self
            .nt_staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        Ok((pool_token_amount, pool_token_amount))
    }

    /// Redeems custodied NT pool tokens: burns them together with the
    /// provider's matching governance tokens and mints the pro-rata NT claim
    /// minus the withdrawal fee.
    pub fn withdraw(
        &mut self,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        provider: Address,
        custody: Address,
        pool_token_amount: u128,
        withdrawal_fee_ppm: u32,
    ) -> Result<MasterWithdrawalAmounts, NetworkError> {
        if pool_token_amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        let supply = registry.total_supply(self.pool_token);
        if supply == 0 || pool_token_amount > supply {
            return Err(NetworkError::InsufficientFunds {
                required: pool_token_amount,
                available: supply,
            });
        }

        let claimed = mul_div_floor(pool_token_amount, self.nt_staked_balance, supply)?;
        let withdrawal_fee =
            mul_div_floor(claimed, withdrawal_fee_ppm as u128, PPM_RESOLUTION as u128)?;
        let nt_amount = claimed - withdrawal_fee;

        registry.burn(self.pool_token, custody, pool_token_amount)?;
        ledger.burn(self.gov_token, provider, pool_token_amount)?;
        ledger.mint(self.nt_token, provider, nt_amount)?;
        self.nt_staked_balance -= claimed;

        Ok(MasterWithdrawalAmounts { nt_amount, withdrawal_fee })
    }

    /// Credits NT-denominated fees (trading or flash-loan) to the staked
    /// balance.
    pub fn on_fees_collected(&mut self, amount: u128) -> Result<(), NetworkError> {
        self.nt_staked_balance = self
            .nt_staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MasterPool, PoolTokenRegistry, TokenLedger, NetworkSettings, Address, Address) {
        let mut registry = PoolTokenRegistry::new();
        let ledger = TokenLedger::new();
        let settings = NetworkSettings::new();
        let pool = MasterPool::new(&mut registry, Address::unique(), Address::unique());
        let vault = Address::unique();
        let bt = Address::unique();
        (pool, registry, ledger, settings, vault, bt)
    }

    #[test]
    fn funding_is_bounded_by_the_limit() {
        let (mut pool, _registry, mut ledger, mut settings, vault, bt) = setup();
        settings.add_to_whitelist(bt).unwrap();
        settings.set_funding_limit(bt, 1_000).unwrap();

        let granted = pool
            .request_liquidity(&mut ledger, &settings, vault, bt, 700)
            .unwrap();
        assert_eq!(granted, 700);
        let granted = pool
            .request_liquidity(&mut ledger, &settings, vault, bt, 700)
            .unwrap();
        assert_eq!(granted, 300);
        assert_eq!(pool.minted_for(bt), 1_000);
        assert_eq!(ledger.balance_of(pool.nt_token(), vault), 1_000);

        pool.renounce_liquidity(&mut ledger, vault, bt, 400).unwrap();
        assert_eq!(pool.minted_for(bt), 600);
        assert_eq!(pool.available_funding(&settings, bt), 400);
    }

    #[test]
    fn nt_deposits_issue_pool_and_governance_tokens() {
        let (mut pool, mut registry, mut ledger, _settings, _vault, _bt) = setup();
        let provider = Address::unique();
        ledger.mint(pool.nt_token(), provider, 5_000).unwrap();

        let (pt, gov) = pool
            .deposit(&mut registry, &mut ledger, provider, provider, 5_000)
            .unwrap();
        assert_eq!(pt, 5_000);
        assert_eq!(gov, 5_000);
        assert_eq!(ledger.balance_of(pool.nt_token(), provider), 0);
        assert_eq!(ledger.balance_of(pool.gov_token(), provider), 5_000);
        assert_eq!(pool.nt_staked_balance(), 5_000);
    }

    #[test]
    fn nt_withdrawal_burns_governance_tokens_and_charges_the_fee() {
        let (mut pool, mut registry, mut ledger, _settings, _vault, _bt) = setup();
        let provider = Address::unique();
        let custody = Address::unique();
        ledger.mint(pool.nt_token(), provider, 10_000).unwrap();
        pool.deposit(&mut registry, &mut ledger, provider, provider, 10_000)
            .unwrap();

        // move the pool tokens into custody as the pending-withdrawal flow does
        registry
            .transfer(pool.pool_token(), provider, custody, 10_000)
            .unwrap();

        let amounts = pool
            .withdraw(&mut registry, &mut ledger, provider, custody, 10_000, 2_500)
            .unwrap();
        assert_eq!(amounts.withdrawal_fee, 25);
        assert_eq!(amounts.nt_amount, 10_000 - 25);
        assert_eq!(ledger.balance_of(pool.nt_token(), provider), 9_975);
        assert_eq!(ledger.balance_of(pool.gov_token(), provider), 0);
        assert_eq!(pool.nt_staked_balance(), 0);
        assert_eq!(registry.total_supply(pool.pool_token()), 0);
    }
}
