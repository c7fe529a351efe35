//! Constants for the liquidity network core
//!
//! This module contains the fee denominators, default settings values and
//! timing bounds used throughout the network.

/// Denominator for parts-per-million calculations (1_000_000 = 100%)
pub const PPM_RESOLUTION: u32 = 1_000_000;

/// Default trading fee applied to new pools
pub const DEFAULT_TRADING_FEE_PPM: u32 = 2_000; // 0.2%

/// Default fee charged on every withdrawal
pub const DEFAULT_WITHDRAWAL_FEE_PPM: u32 = 2_500; // 0.25%

/// Default fee charged on every flash loan
pub const DEFAULT_FLASH_LOAN_FEE_PPM: u32 = 900; // 0.09%

/// Default maximum allowed deviation between the spot and average rates
pub const DEFAULT_AVG_RATE_MAX_DEVIATION_PPM: u32 = 10_000; // 1%

/// Default network-token floor below which trading cannot be enabled
pub const DEFAULT_MIN_LIQUIDITY_FOR_TRADING: u128 = 10_000;

/// Default time a withdrawal request stays locked before it becomes ready
pub const DEFAULT_LOCK_DURATION: u32 = 604_800; // 7 days

/// Default window during which a ready withdrawal request can be completed
pub const DEFAULT_WITHDRAWAL_WINDOW_DURATION: u32 = 259_200; // 3 days

/// Time window over which the average rate converges towards the spot rate
pub const RATE_AVERAGING_WINDOW: u32 = 600; // 10 minutes

/// Maximum bit width kept when reducing rate fractions
pub const MAX_RATE_FRACTION_BITS: u32 = 112;
