//! Withdrawal Request State
//!
//! The record backing the two-phase withdrawal lifecycle. Status is derived
//! from the clock rather than stored, so requests never need a background
//! transition.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::pool_token::PoolTokenId;
use crate::types::Address;

/// Lifecycle position of a withdrawal request.
///
/// `Initiated → Ready` after the lock duration; `Ready → Expired` after the
/// withdrawal window. Completion removes the request; expiry requires
/// re-initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Initiated,
    Ready,
    Expired,
}

/// A provider's pending claim on custodied pool tokens.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawalRequest {
    pub id: u64,
    pub provider: Address,
    pub pool_token: PoolTokenId,
    /// Reserve token the custodied shares redeem into
    pub reserve_token: Address,
    pub pool_token_amount: u128,
    pub created_at: u32,
}

impl WithdrawalRequest {
    /// Derives the lifecycle position at `now`.
    pub fn status(&self, now: u32, lock_duration: u32, withdrawal_window: u32) -> RequestStatus {
        let elapsed = now.saturating_sub(self.created_at);
        if elapsed < lock_duration {
            RequestStatus::Initiated
        } else if elapsed - lock_duration < withdrawal_window {
            RequestStatus::Ready
        } else {
            RequestStatus::Expired
        }
    }
}
