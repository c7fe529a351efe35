use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use thiserror::Error;

/// Comprehensive error types for the liquidity network core.
///
/// This enum defines all failure kinds that externally visible operations can
/// produce. Every public operation either commits all of its state changes or
/// fails with one of these and commits nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// An address argument was the zero address
    #[error("Invalid address")]
    InvalidAddress,

    /// A token argument is not usable in this position
    #[error("Invalid token")]
    InvalidToken,

    /// The referenced pool is not serviced by this collection
    #[error("Invalid pool")]
    InvalidPool,

    /// A pool-type argument does not match the registered collections
    #[error("Invalid pool type")]
    InvalidType,

    /// The referenced pool collection is unknown or not eligible
    #[error("Invalid pool collection")]
    InvalidPoolCollection,

    /// A fee setting is outside the PPM domain
    #[error("Invalid fee: {fee_ppm} exceeds the PPM resolution")]
    InvalidFee { fee_ppm: u32 },

    /// The entity being created is already defined
    #[error("Already exists")]
    AlreadyExists,

    /// The referenced entity is not defined
    #[error("Does not exist")]
    DoesNotExist,

    /// The collection still services pools and cannot be removed
    #[error("Not empty")]
    NotEmpty,

    /// The token has not been whitelisted
    #[error("Not whitelisted")]
    NotWhitelisted,

    /// The caller does not hold the required role
    #[error("Access denied")]
    AccessDenied,

    /// A zero amount was supplied where a positive amount is required
    #[error("Zero value")]
    ZeroValue,

    /// A balance or allowance is too small for the requested movement
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    /// The deposit would push the staked balance past the pool's limit
    #[error("Deposit limit exceeded")]
    DepositLimitExceeded,

    /// Depositing is disabled for the pool
    #[error("Depositing disabled")]
    DepositingDisabled,

    /// Trading is disabled for the pool
    #[error("Trading disabled")]
    TradingDisabled,

    /// The network-token side of the pool cannot support the operation
    #[error("Network liquidity disabled")]
    NetworkLiquidityDisabled,

    /// The spot rate deviates too far from the average rate
    #[error("Rate unstable")]
    RateUnstable,

    /// The trade output is below the caller's minimum
    #[error("Return amount too low")]
    ReturnAmountTooLow,

    /// The operation deadline has passed
    #[error("Deadline expired")]
    DeadlineExpired,

    /// The attached native value does not match the token amount
    #[error("Native value mismatch")]
    EthAmountMismatch,

    /// The flash-loan recipient did not return the amount plus fee
    #[error("Insufficient flash loan return")]
    InsufficientFlashLoanReturn,

    /// The withdrawal request is not inside its ready window
    #[error("Withdrawal not allowed")]
    WithdrawalNotAllowed,

    /// Permit-signed approvals are not supported for this token
    #[error("Permit unsupported")]
    PermitUnsupported,

    /// The vault is paused and rejects withdrawals
    #[error("Paused")]
    Paused,

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,

    /// A nested call re-entered the network mid-operation
    #[error("Reentrant call")]
    Reentrant,
}

/// Stable numeric codes for each error kind.
///
/// Codes are part of the client interface and never change meaning once
/// assigned; new kinds append at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ErrorCode {
    InvalidAddress = 1001,
    InvalidToken = 1002,
    InvalidPool = 1003,
    InvalidType = 1004,
    InvalidPoolCollection = 1005,
    InvalidFee = 1006,
    AlreadyExists = 1007,
    DoesNotExist = 1008,
    NotEmpty = 1009,
    NotWhitelisted = 1010,
    AccessDenied = 1011,
    ZeroValue = 1012,
    InsufficientFunds = 1013,
    DepositLimitExceeded = 1014,
    DepositingDisabled = 1015,
    TradingDisabled = 1016,
    NetworkLiquidityDisabled = 1017,
    RateUnstable = 1018,
    ReturnAmountTooLow = 1019,
    DeadlineExpired = 1020,
    EthAmountMismatch = 1021,
    InsufficientFlashLoanReturn = 1022,
    WithdrawalNotAllowed = 1023,
    PermitUnsupported = 1024,
    Paused = 1025,
    Overflow = 1026,
    Reentrant = 1027,
}

impl ErrorCode {
    /// Looks up an error code by its stable numeric value.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }
}

impl NetworkError {
    /// Returns the stable code for this error kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            NetworkError::InvalidAddress => ErrorCode::InvalidAddress,
            NetworkError::InvalidToken => ErrorCode::InvalidToken,
            NetworkError::InvalidPool => ErrorCode::InvalidPool,
            NetworkError::InvalidType => ErrorCode::InvalidType,
            NetworkError::InvalidPoolCollection => ErrorCode::InvalidPoolCollection,
            NetworkError::InvalidFee { .. } => ErrorCode::InvalidFee,
            NetworkError::AlreadyExists => ErrorCode::AlreadyExists,
            NetworkError::DoesNotExist => ErrorCode::DoesNotExist,
            NetworkError::NotEmpty => ErrorCode::NotEmpty,
            NetworkError::NotWhitelisted => ErrorCode::NotWhitelisted,
            NetworkError::AccessDenied => ErrorCode::AccessDenied,
            NetworkError::ZeroValue => ErrorCode::ZeroValue,
            NetworkError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            NetworkError::DepositLimitExceeded => ErrorCode::DepositLimitExceeded,
            NetworkError::DepositingDisabled => ErrorCode::DepositingDisabled,
            NetworkError::TradingDisabled => ErrorCode::TradingDisabled,
            NetworkError::NetworkLiquidityDisabled => ErrorCode::NetworkLiquidityDisabled,
            NetworkError::RateUnstable => ErrorCode::RateUnstable,
            NetworkError::ReturnAmountTooLow => ErrorCode::ReturnAmountTooLow,
            NetworkError::DeadlineExpired => ErrorCode::DeadlineExpired,
            NetworkError::EthAmountMismatch => ErrorCode::EthAmountMismatch,
            NetworkError::InsufficientFlashLoanReturn => ErrorCode::InsufficientFlashLoanReturn,
            NetworkError::WithdrawalNotAllowed => ErrorCode::WithdrawalNotAllowed,
            NetworkError::PermitUnsupported => ErrorCode::PermitUnsupported,
            NetworkError::Paused => ErrorCode::Paused,
            NetworkError::Overflow => ErrorCode::Overflow,
            NetworkError::Reentrant => ErrorCode::Reentrant,
        }
    }

    /// Returns the stable numeric code for this error kind.
    pub fn error_code(&self) -> u32 {
        self.code().to_u32().unwrap_or(0)
    }
}
