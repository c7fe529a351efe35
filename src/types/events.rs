//! Network Events
//!
//! Every externally visible operation appends events to the network's event
//! buffer after its state mutations are committed. All events of one
//! operation share a context id so off-chain consumers can join effects.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;

use super::address::Address;

/// Correlation id shared by all events of one operation.
#[derive(Clone, Copy, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct ContextId(pub [u8; 32]);

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", hex::encode(self.0))
    }
}

/// The kind of fee being credited to a staked balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum FeeType {
    Trading,
    FlashLoan,
    Withdrawal,
}

/// Events emitted by the network facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PoolAdded {
        context_id: ContextId,
        pool_type: u16,
        token: Address,
    },
    PoolRemoved {
        context_id: ContextId,
        pool_type: u16,
        token: Address,
    },
    BaseTokenDeposited {
        context_id: ContextId,
        token: Address,
        provider: Address,
        amount: u128,
        pool_token_amount: u128,
    },
    NetworkTokenDeposited {
        context_id: ContextId,
        provider: Address,
        amount: u128,
        pool_token_amount: u128,
        gov_token_amount: u128,
    },
    BaseTokenWithdrawn {
        context_id: ContextId,
        token: Address,
        provider: Address,
        base_amount: u128,
        external_protection_amount: u128,
        nt_amount: u128,
        withdrawal_fee: u128,
    },
    NetworkTokenWithdrawn {
        context_id: ContextId,
        provider: Address,
        nt_amount: u128,
        pool_token_amount: u128,
        withdrawal_fee: u128,
    },
    TokensTraded {
        context_id: ContextId,
        trader: Address,
        source_token: Address,
        target_token: Address,
        source_amount: u128,
        target_amount: u128,
    },
    FeesCollected {
        context_id: ContextId,
        token: Address,
        fee_type: FeeType,
        amount: u128,
        staked_balance: u128,
    },
    TotalLiquidityUpdated {
        context_id: ContextId,
        token: Address,
        liquidity: u128,
        staked_balance: u128,
        pool_token_supply: u128,
    },
    TradingLiquidityUpdated {
        context_id: ContextId,
        pool: Address,
        token: Address,
        liquidity: u128,
    },
    FlashLoanCompleted {
        context_id: ContextId,
        token: Address,
        borrower: Address,
        amount: u128,
    },
    PoolCollectionAdded {
        context_id: ContextId,
        pool_type: u16,
        version: u16,
    },
    PoolCollectionRemoved {
        context_id: ContextId,
        pool_type: u16,
        version: u16,
    },
    LatestPoolCollectionReplaced {
        context_id: ContextId,
        pool_type: u16,
        previous_version: u16,
        new_version: u16,
    },
}
