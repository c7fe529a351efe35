//! Pending Withdrawals
//!
//! The two-phase withdrawal lifecycle. Initiation takes the provider's pool
//! tokens into custody and starts the lock; completion is only possible
//! inside the ready window; cancellation hands the tokens back at any point
//! before completion. The clock is injected so tests can drive time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;

use crate::clock::Clock;
use crate::constants::{DEFAULT_LOCK_DURATION, DEFAULT_WITHDRAWAL_WINDOW_DURATION};
use crate::error::NetworkError;
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::state::{RequestStatus, WithdrawalRequest};
use crate::types::Address;

/// Registry of open withdrawal requests.
pub struct PendingWithdrawals {
    address: Address,
    clock: Arc<dyn Clock>,
    lock_duration: u32,
    withdrawal_window_duration: u32,
    next_id: u64,
    requests: BTreeMap<u64, WithdrawalRequest>,
    by_provider: BTreeMap<Address, BTreeSet<u64>>,
}

impl PendingWithdrawals {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        PendingWithdrawals {
            address: Address::unique(),
            clock,
            lock_duration: DEFAULT_LOCK_DURATION,
            withdrawal_window_duration: DEFAULT_WITHDRAWAL_WINDOW_DURATION,
            next_id: 0,
            requests: BTreeMap::new(),
            by_provider: BTreeMap::new(),
        }
    }

    /// Custody address the pool tokens are parked under.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn lock_duration(&self) -> u32 {
        self.lock_duration
    }

    pub fn set_lock_duration(&mut self, duration: u32) -> Result<(), NetworkError> {
        if duration == 0 {
            return Err(NetworkError::ZeroValue);
        }
        self.lock_duration = duration;
        Ok(())
    }

    pub fn withdrawal_window_duration(&self) -> u32 {
        self.withdrawal_window_duration
    }

    pub fn set_withdrawal_window_duration(&mut self, duration: u32) -> Result<(), NetworkError> {
        if duration == 0 {
            return Err(NetworkError::ZeroValue);
        }
        self.withdrawal_window_duration = duration;
        Ok(())
    }

    /// Locks `pool_token_amount` of the provider's shares and opens a request.
    pub fn init_withdrawal(
        &mut self,
        registry: &mut PoolTokenRegistry,
        provider: Address,
        pool_token: PoolTokenId,
        pool_token_amount: u128,
    ) -> Result<u64, NetworkError> {
        if provider.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        if pool_token_amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        let reserve_token = registry.reserve_token(pool_token)?;
        registry.transfer(pool_token, provider, self.address, pool_token_amount)?;

        self.next_id += 1;
        let id = self.next_id;
        let request = WithdrawalRequest {
            id,
            provider,
            pool_token,
            reserve_token,
            pool_token_amount,
            created_at: self.clock.seconds(),
        };
        self.requests.insert(id, request);
        self.by_provider.entry(provider).or_default().insert(id);
        debug!("withdrawal request {id} opened by {provider} for {pool_token_amount} shares");
        Ok(id)
    }

    /// Closes a ready request and returns it; the caller burns the custodied
    /// shares and pays the provider out.
    pub fn complete_withdrawal(
        &mut self,
        id: u64,
        provider: Address,
    ) -> Result<WithdrawalRequest, NetworkError> {
        let request = self.requests.get(&id).ok_or(NetworkError::DoesNotExist)?;
        if request.provider != provider {
            return Err(NetworkError::AccessDenied);
        }
        if self.status_of(request) != RequestStatus::Ready {
            return Err(NetworkError::WithdrawalNotAllowed);
        }
        self.remove(id)
    }

    /// Returns the custodied shares to the provider and drops the request.
    /// Allowed in every state before completion; an expired request must be
    /// cancelled and re-initiated.
    pub fn cancel_withdrawal(
        &mut self,
        registry: &mut PoolTokenRegistry,
        id: u64,
        provider: Address,
    ) -> Result<(), NetworkError> {
        let request = self.requests.get(&id).ok_or(NetworkError::DoesNotExist)?;
        if request.provider != provider {
            return Err(NetworkError::AccessDenied);
        }
        registry.transfer(request.pool_token, self.address, provider, request.pool_token_amount)?;
        self.remove(id)?;
        debug!("withdrawal request {id} cancelled");
        Ok(())
    }

    pub fn withdrawal_request(&self, id: u64) -> Option<&WithdrawalRequest> {
        self.requests.get(&id)
    }

    /// Ids of all open requests belonging to `provider`.
    pub fn withdrawal_request_ids(&self, provider: Address) -> Vec<u64> {
        self.by_provider
            .get(&provider)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True when the request exists and sits inside its ready window.
    pub fn is_ready(&self, id: u64) -> bool {
        self.requests
            .get(&id)
            .map(|r| self.status_of(r) == RequestStatus::Ready)
            .unwrap_or(false)
    }

    /// Lifecycle position of the request at the current time.
    pub fn status(&self, id: u64) -> Option<RequestStatus> {
        self.requests.get(&id).map(|r| self.status_of(r))
    }

    fn status_of(&self, request: &WithdrawalRequest) -> RequestStatus {
        request.status(
            self.clock.seconds(),
            self.lock_duration,
            self.withdrawal_window_duration,
        )
    }

    fn remove(&mut self, id: u64) -> Result<WithdrawalRequest, NetworkError> {
        let request = self.requests.remove(&id).ok_or(NetworkError::DoesNotExist)?;
        if let Some(ids) = self.by_provider.get_mut(&request.provider) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_provider.remove(&request.provider);
            }
        }
        Ok(request)
    }
}
