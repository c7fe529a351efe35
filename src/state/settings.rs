//! Network Settings
//!
//! Administrative knobs shared by every component: the token whitelist,
//! per-pool funding limits, fee rates and the trading-liquidity floor.
//! Setters validate their domain; role gating happens at the network facade.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use log::debug;

use crate::constants::{
    DEFAULT_AVG_RATE_MAX_DEVIATION_PPM, DEFAULT_FLASH_LOAN_FEE_PPM,
    DEFAULT_MIN_LIQUIDITY_FOR_TRADING, DEFAULT_WITHDRAWAL_FEE_PPM, PPM_RESOLUTION,
};
use crate::error::NetworkError;
use crate::types::Address;

/// Global configuration state.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct NetworkSettings {
    whitelist: BTreeSet<Address>,
    funding_limits: BTreeMap<Address, u128>,
    min_liquidity_for_trading: u128,
    avg_rate_max_deviation_ppm: u32,
    withdrawal_fee_ppm: u32,
    flash_loan_fee_ppm: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            whitelist: BTreeSet::new(),
            funding_limits: BTreeMap::new(),
            min_liquidity_for_trading: DEFAULT_MIN_LIQUIDITY_FOR_TRADING,
            avg_rate_max_deviation_ppm: DEFAULT_AVG_RATE_MAX_DEVIATION_PPM,
            withdrawal_fee_ppm: DEFAULT_WITHDRAWAL_FEE_PPM,
            flash_loan_fee_ppm: DEFAULT_FLASH_LOAN_FEE_PPM,
        }
    }
}

impl NetworkSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_whitelisted(&self, token: Address) -> bool {
        self.whitelist.contains(&token)
    }

    pub fn add_to_whitelist(&mut self, token: Address) -> Result<(), NetworkError> {
        if token.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        if !self.whitelist.insert(token) {
            return Err(NetworkError::AlreadyExists);
        }
        debug!("whitelisted token {token}");
        Ok(())
    }

    pub fn remove_from_whitelist(&mut self, token: Address) -> Result<(), NetworkError> {
        if !self.whitelist.remove(&token) {
            return Err(NetworkError::DoesNotExist);
        }
        Ok(())
    }

    /// Max NT ever minted into `token`'s trading liquidity.
    pub fn funding_limit(&self, token: Address) -> u128 {
        self.funding_limits.get(&token).copied().unwrap_or(0)
    }

    pub fn set_funding_limit(&mut self, token: Address, limit: u128) -> Result<(), NetworkError> {
        if !self.is_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        self.funding_limits.insert(token, limit);
        Ok(())
    }

    /// Legacy name for [`NetworkSettings::funding_limit`]; reads the same slot.
    pub fn pool_minting_limit(&self, token: Address) -> u128 {
        self.funding_limit(token)
    }

    /// Legacy name for [`NetworkSettings::set_funding_limit`].
    pub fn set_pool_minting_limit(
        &mut self,
        token: Address,
        limit: u128,
    ) -> Result<(), NetworkError> {
        self.set_funding_limit(token, limit)
    }

    pub fn min_liquidity_for_trading(&self) -> u128 {
        self.min_liquidity_for_trading
    }

    pub fn set_min_liquidity_for_trading(&mut self, amount: u128) {
        self.min_liquidity_for_trading = amount;
    }

    pub fn avg_rate_max_deviation_ppm(&self) -> u32 {
        self.avg_rate_max_deviation_ppm
    }

    pub fn set_avg_rate_max_deviation_ppm(&mut self, ppm: u32) -> Result<(), NetworkError> {
        validate_ppm(ppm)?;
        self.avg_rate_max_deviation_ppm = ppm;
        Ok(())
    }

    pub fn withdrawal_fee_ppm(&self) -> u32 {
        self.withdrawal_fee_ppm
    }

    pub fn set_withdrawal_fee_ppm(&mut self, ppm: u32) -> Result<(), NetworkError> {
        validate_ppm(ppm)?;
        self.withdrawal_fee_ppm = ppm;
        Ok(())
    }

    pub fn flash_loan_fee_ppm(&self) -> u32 {
        self.flash_loan_fee_ppm
    }

    pub fn set_flash_loan_fee_ppm(&mut self, ppm: u32) -> Result<(), NetworkError> {
        validate_ppm(ppm)?;
        self.flash_loan_fee_ppm = ppm;
        Ok(())
    }
}

fn validate_ppm(ppm: u32) -> Result<(), NetworkError> {
    if ppm > PPM_RESOLUTION {
        return Err(NetworkError::InvalidFee { fee_ppm: ppm });
    }
    Ok(())
}
