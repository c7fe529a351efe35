//! Token Ledger
//!
//! The ERC-20-style boundary collaborator the core moves value through. The
//! host chain owns real token contracts; this ledger mirrors the consumed
//! interface — `transfer`, `transfer_from`, `balance_of`, `total_supply`,
//! `approve`, `permit` — so the core and its tests have a concrete seam.
//!
//! The native chain token is an ordinary ledger entry under the
//! [`Address::NATIVE`] sentinel; value-carrying calls reduce to transfers on
//! that entry.

use std::collections::BTreeMap;

use log::debug;

use crate::error::NetworkError;
use crate::types::Address;

/// A signature-bearing approval, produced off-core and consumed by the
/// `*_permitted` operation variants.
///
/// Signature verification is the host's responsibility; the ledger enforces
/// the deadline and applies the allowance.
#[derive(Debug, Clone)]
pub struct Permit {
    pub owner: Address,
    pub spender: Address,
    pub value: u128,
    pub deadline: u32,
    pub signature: Vec<u8>,
}

#[derive(Debug, Default)]
struct TokenState {
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
}

/// Balances and allowances for every token the network touches.
#[derive(Debug, Default)]
pub struct TokenLedger {
    tokens: BTreeMap<Address, TokenState>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: Address, owner: Address) -> u128 {
        self.tokens
            .get(&token)
            .and_then(|t| t.balances.get(&owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self, token: Address) -> u128 {
        self.tokens.get(&token).map(|t| t.total_supply).unwrap_or(0)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.tokens
            .get(&token)
            .and_then(|t| t.allowances.get(&(owner, spender)))
            .copied()
            .unwrap_or(0)
    }

    /// Creates `amount` new units of `token` owned by `to`.
    pub fn mint(&mut self, token: Address, to: Address, amount: u128) -> Result<(), NetworkError> {
        if to.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        let state = self.tokens.entry(token).or_default();
        state.total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(NetworkError::Overflow)?;
        let balance = state.balances.entry(to).or_insert(0);
        *balance += amount;
        Ok(())
    }

    /// Destroys `amount` units of `token` owned by `from`.
    pub fn burn(&mut self, token: Address, from: Address, amount: u128) -> Result<(), NetworkError> {
        let state = self.tokens.entry(token).or_default();
        let balance = state.balances.entry(from).or_insert(0);
        if *balance < amount {
            return Err(NetworkError::InsufficientFunds {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        state.total_supply -= amount;
        Ok(())
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        if to.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        let state = self.tokens.entry(token).or_default();
        let from_balance = state.balances.entry(from).or_insert(0);
        if *from_balance < amount {
            return Err(NetworkError::InsufficientFunds {
                required: amount,
                available: *from_balance,
            });
        }
        *from_balance -= amount;
        *state.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Sets the allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        let state = self.tokens.entry(token).or_default();
        state.allowances.insert((owner, spender), amount);
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`,
    /// consuming allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        let allowance = self.allowance(token, from, spender);
        if allowance < amount {
            return Err(NetworkError::InsufficientFunds {
                required: amount,
                available: allowance,
            });
        }
        self.transfer(token, from, to, amount)?;
        let state = self.tokens.entry(token).or_default();
        state.allowances.insert((from, spender), allowance - amount);
        Ok(())
    }

    /// Applies a signature-bearing approval.
    pub fn permit(&mut self, token: Address, permit: &Permit, now: u32) -> Result<(), NetworkError> {
        if now > permit.deadline {
            return Err(NetworkError::DeadlineExpired);
        }
        debug!(
            "permit applied: token {} owner {} spender {} value {}",
            token, permit.owner, permit.spender, permit.value
        );
        self.approve(token, permit.owner, permit.spender, permit.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut ledger = TokenLedger::new();
        let token = Address::unique();
        let owner = Address::unique();
        let spender = Address::unique();
        let sink = Address::unique();

        ledger.mint(token, owner, 1_000).unwrap();
        ledger.approve(token, owner, spender, 600);

        ledger.transfer_from(token, spender, owner, sink, 400).unwrap();
        assert_eq!(ledger.allowance(token, owner, spender), 200);
        assert_eq!(ledger.balance_of(token, sink), 400);

        let err = ledger.transfer_from(token, spender, owner, sink, 300);
        assert_eq!(
            err,
            Err(NetworkError::InsufficientFunds { required: 300, available: 200 })
        );
    }

    #[test]
    fn permit_respects_the_deadline() {
        let mut ledger = TokenLedger::new();
        let token = Address::unique();
        let permit = Permit {
            owner: Address::unique(),
            spender: Address::unique(),
            value: 100,
            deadline: 50,
            signature: vec![0x1b; 65],
        };
        assert_eq!(ledger.permit(token, &permit, 51), Err(NetworkError::DeadlineExpired));
        ledger.permit(token, &permit, 50).unwrap();
        assert_eq!(ledger.allowance(token, permit.owner, permit.spender), 100);
    }

    #[test]
    fn burn_requires_balance() {
        let mut ledger = TokenLedger::new();
        let token = Address::unique();
        let owner = Address::unique();
        ledger.mint(token, owner, 10).unwrap();
        assert!(ledger.burn(token, owner, 11).is_err());
        ledger.burn(token, owner, 10).unwrap();
        assert_eq!(ledger.total_supply(token), 0);
    }
}
