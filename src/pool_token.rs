//! Pool-Token Registry
//!
//! One share token per pool, representing a pro-rata claim on that pool's
//! staked balance. Minting and burning are reserved for the owning component
//! (the pool collection servicing the pool, or the master pool for the
//! network token); transfers are open so providers can move shares into
//! withdrawal custody.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;

use crate::error::NetworkError;
use crate::types::Address;

/// Handle to one pool's share token.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize, BorshDeserialize,
)]
pub struct PoolTokenId(pub u32);

impl fmt::Debug for PoolTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolTokenId({})", self.0)
    }
}

#[derive(Debug)]
struct PoolToken {
    reserve_token: Address,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
}

/// All pool tokens issued by the network.
#[derive(Debug, Default)]
pub struct PoolTokenRegistry {
    next_id: u32,
    tokens: BTreeMap<PoolTokenId, PoolToken>,
}

impl PoolTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh share token for `reserve_token`.
    pub(crate) fn create(&mut self, reserve_token: Address) -> PoolTokenId {
        self.next_id += 1;
        let id = PoolTokenId(self.next_id);
        self.tokens.insert(
            id,
            PoolToken { reserve_token, total_supply: 0, balances: BTreeMap::new() },
        );
        id
    }

    /// The reserve token this share token redeems into.
    pub fn reserve_token(&self, id: PoolTokenId) -> Result<Address, NetworkError> {
        self.tokens
            .get(&id)
            .map(|t| t.reserve_token)
            .ok_or(NetworkError::DoesNotExist)
    }

    pub fn total_supply(&self, id: PoolTokenId) -> u128 {
        self.tokens.get(&id).map(|t| t.total_supply).unwrap_or(0)
    }

    pub fn balance_of(&self, id: PoolTokenId, owner: Address) -> u128 {
        self.tokens
            .get(&id)
            .and_then(|t| t.balances.get(&owner))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn mint(
        &mut self,
        id: PoolTokenId,
        to: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        if to.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        let token = self.tokens.get_mut(&id).ok_or(NetworkError::DoesNotExist)?;
        token.total_supply = token
            .total_supply
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        *token.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    pub(crate) fn burn(
        &mut self,
        id: PoolTokenId,
        from: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        let token = self.tokens.get_mut(&id).ok_or(NetworkError::DoesNotExist)?;
        let balance = token.balances.entry(from).or_insert(0);
        if *balance < amount {
            return Err(NetworkError::InsufficientFunds {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        token.total_supply -= amount;
        Ok(())
    }

    /// Moves shares between holders.
    pub fn transfer(
        &mut self,
        id: PoolTokenId,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        if to.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        let token = self.tokens.get_mut(&id).ok_or(NetworkError::DoesNotExist)?;
        let from_balance = token.balances.entry(from).or_insert(0);
        if *from_balance < amount {
            return Err(NetworkError::InsufficientFunds {
                required: amount,
                available: *from_balance,
            });
        }
        *from_balance -= amount;
        *token.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supply_tracks_mints_and_burns() {
        let mut registry = PoolTokenRegistry::new();
        let reserve = Address::unique();
        let holder = Address::unique();
        let id = registry.create(reserve);

        assert_eq!(registry.reserve_token(id).unwrap(), reserve);
        registry.mint(id, holder, 500).unwrap();
        assert_eq!(registry.total_supply(id), 500);

        registry.burn(id, holder, 200).unwrap();
        assert_eq!(registry.total_supply(id), 300);
        assert_eq!(registry.balance_of(id, holder), 300);

        assert!(matches!(
            registry.burn(id, holder, 301),
            Err(NetworkError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let registry = PoolTokenRegistry::new();
        assert_eq!(
            registry.reserve_token(PoolTokenId(9)),
            Err(NetworkError::DoesNotExist)
        );
        assert_eq!(registry.total_supply(PoolTokenId(9)), 0);
    }
}
