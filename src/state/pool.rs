//! Pool State
//!
//! One record per whitelisted base token in a collection. The record is the
//! unit of migration between collections: it round-trips through borsh
//! unchanged, which is what the upgrade path relies on.

use borsh::{BorshDeserialize, BorshSerialize};
use primitive_types::U256;

use crate::constants::DEFAULT_TRADING_FEE_PPM;
use crate::pool_token::PoolTokenId;
use crate::types::Fraction;

/// Time-weighted reference rate, guarding trades against manipulated spots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct AverageRate {
    /// NT per base token
    pub rate: Fraction,
    /// Timestamp of the last fold-in
    pub time: u32,
}

/// 256-bit product of the two trading reserves, split into words for
/// serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct ReserveProduct {
    pub hi: u128,
    pub lo: u128,
}

impl ReserveProduct {
    /// Caches `base · nt`.
    pub fn of(base_liquidity: u128, nt_liquidity: u128) -> Self {
        let product = U256::from(base_liquidity) * U256::from(nt_liquidity);
        ReserveProduct {
            hi: (product >> 128).low_u128(),
            lo: product.low_u128(),
        }
    }

    pub fn to_u256(self) -> U256 {
        (U256::from(self.hi) << 128) | U256::from(self.lo)
    }
}

/// Per-pool accounting record.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Pool {
    /// Handle to this pool's share token
    pub pool_token: PoolTokenId,
    /// Fee charged on trades through this pool, in PPM
    pub trading_fee_ppm: u32,
    pub trading_enabled: bool,
    pub depositing_enabled: bool,
    /// Base-token reserve pricing the curve (`b`)
    pub base_trading_liquidity: u128,
    /// Network-token reserve pricing the curve (`n`)
    pub nt_trading_liquidity: u128,
    /// Cached `b · n`, cheap staleness probe for the average rate
    pub trading_liquidity_product: ReserveProduct,
    /// Total base-token value owed to providers, fees included (`s`)
    pub staked_balance: u128,
    /// Rate seeding the bootstrap liquidity when trading is enabled
    pub initial_rate: Fraction,
    /// Ceiling on the staked balance
    pub deposit_limit: u128,
    pub average_rate: AverageRate,
}

impl Pool {
    pub fn new(pool_token: PoolTokenId) -> Self {
        Pool {
            pool_token,
            trading_fee_ppm: DEFAULT_TRADING_FEE_PPM,
            trading_enabled: false,
            depositing_enabled: true,
            base_trading_liquidity: 0,
            nt_trading_liquidity: 0,
            trading_liquidity_product: ReserveProduct::default(),
            staked_balance: 0,
            initial_rate: Fraction::ZERO,
            deposit_limit: u128::MAX,
            average_rate: AverageRate::default(),
        }
    }

    /// Current NT-per-base spot rate; zero when the curve is unfunded.
    pub fn spot_rate(&self) -> Fraction {
        Fraction::new(self.nt_trading_liquidity, self.base_trading_liquidity)
    }

    /// Recomputes the reserve-product cache after a liquidity change.
    pub fn refresh_product(&mut self) {
        self.trading_liquidity_product =
            ReserveProduct::of(self.base_trading_liquidity, self.nt_trading_liquidity);
    }

    /// True when the cached product no longer matches the live reserves,
    /// i.e. liquidity moved since the average rate was last folded.
    pub fn product_is_stale(&self) -> bool {
        self.trading_liquidity_product
            != ReserveProduct::of(self.base_trading_liquidity, self.nt_trading_liquidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::{BorshDeserialize, BorshSerialize};

    #[test]
    fn reserve_product_round_trips_through_words() {
        let product = ReserveProduct::of(u128::MAX, u128::MAX);
        let expected = U256::from(u128::MAX) * U256::from(u128::MAX);
        assert_eq!(product.to_u256(), expected);
    }

    #[test]
    fn pool_record_round_trips_through_borsh() {
        let mut pool = Pool::new(PoolTokenId(7));
        pool.staked_balance = 123_456;
        pool.base_trading_liquidity = 1_000;
        pool.nt_trading_liquidity = 2_000;
        pool.refresh_product();
        pool.average_rate = AverageRate { rate: Fraction::new(2, 1), time: 42 };

        let bytes = pool.try_to_vec().unwrap();
        let restored = Pool::try_from_slice(&bytes).unwrap();
        assert_eq!(restored, pool);
    }

    #[test]
    fn product_staleness_tracks_reserve_changes() {
        let mut pool = Pool::new(PoolTokenId(1));
        pool.base_trading_liquidity = 10;
        pool.nt_trading_liquidity = 20;
        pool.refresh_product();
        assert!(!pool.product_is_stale());
        pool.nt_trading_liquidity = 21;
        assert!(pool.product_is_stale());
    }
}
