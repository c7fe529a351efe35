//! Vaults
//!
//! Typed custodians for the funds the network moves: the master vault (base
//! tokens and NT backing trades), the external-protection vault (emergency
//! base-token reserve) and the NT-governance vault. All three share one
//! implementation: open deposits, role-gated withdrawals, and a pause flag
//! that blocks withdrawals only.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::NetworkError;
use crate::token::TokenLedger;
use crate::types::{Address, Role};

/// Which custodian a vault instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultKind {
    Master,
    ExternalProtection,
    NtGovernance,
}

/// A role-gated token custodian.
#[derive(Debug)]
pub struct Vault {
    kind: VaultKind,
    address: Address,
    paused: bool,
    roles: BTreeMap<Role, BTreeSet<Address>>,
}

impl Vault {
    /// Creates a vault with `admin` holding [`Role::Admin`].
    pub fn new(kind: VaultKind, admin: Address) -> Self {
        let mut roles: BTreeMap<Role, BTreeSet<Address>> = BTreeMap::new();
        roles.entry(Role::Admin).or_default().insert(admin);
        Vault { kind, address: Address::unique(), paused: false, roles }
    }

    pub fn kind(&self) -> VaultKind {
        self.kind
    }

    /// The custody address funds are held under in the token ledger.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.roles.get(&role).map(|s| s.contains(&account)).unwrap_or(false)
    }

    /// Role grant used while wiring components together at construction.
    pub(crate) fn grant_role_unchecked(&mut self, role: Role, account: Address) {
        self.roles.entry(role).or_default().insert(account);
    }

    pub fn grant_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), NetworkError> {
        self.require_role(Role::Admin, caller)?;
        if account.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        self.roles.entry(role).or_default().insert(account);
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), NetworkError> {
        self.require_role(Role::Admin, caller)?;
        self.roles.entry(role).or_default().remove(&account);
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), NetworkError> {
        self.require_role(Role::Admin, caller)?;
        self.paused = true;
        warn!("{:?} vault paused", self.kind);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), NetworkError> {
        self.require_role(Role::Admin, caller)?;
        self.paused = false;
        Ok(())
    }

    /// Moves `amount` of `token` from `from` into custody. Permitted while
    /// paused.
    pub fn deposit(
        &self,
        ledger: &mut TokenLedger,
        token: Address,
        from: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        if amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        ledger.transfer(token, from, self.address, amount)
    }

    /// Pays `amount` of `token` out of custody; requires
    /// [`Role::AssetManager`] and an unpaused vault.
    pub fn withdraw(
        &self,
        ledger: &mut TokenLedger,
        caller: Address,
        token: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        if self.paused {
            return Err(NetworkError::Paused);
        }
        self.require_role(Role::AssetManager, caller)?;
        if recipient.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        debug!("{:?} vault paying {} of {} to {}", self.kind, amount, token, recipient);
        ledger.transfer(token, self.address, recipient, amount)
    }

    /// Custodied balance of `token`.
    pub fn balance(&self, ledger: &TokenLedger, token: Address) -> u128 {
        ledger.balance_of(token, self.address)
    }

    fn require_role(&self, role: Role, account: Address) -> Result<(), NetworkError> {
        if !self.has_role(role, account) {
            return Err(NetworkError::AccessDenied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_blocks_withdrawals_but_not_deposits() {
        let admin = Address::unique();
        let manager = Address::unique();
        let user = Address::unique();
        let token = Address::unique();

        let mut ledger = TokenLedger::new();
        ledger.mint(token, user, 1_000).unwrap();

        let mut vault = Vault::new(VaultKind::Master, admin);
        vault.grant_role(admin, Role::AssetManager, manager).unwrap();
        vault.pause(admin).unwrap();

        vault.deposit(&mut ledger, token, user, 600).unwrap();
        assert_eq!(vault.balance(&ledger, token), 600);

        assert_eq!(
            vault.withdraw(&mut ledger, manager, token, user, 100),
            Err(NetworkError::Paused)
        );

        vault.unpause(admin).unwrap();
        vault.withdraw(&mut ledger, manager, token, user, 100).unwrap();
        assert_eq!(vault.balance(&ledger, token), 500);
    }

    #[test]
    fn withdrawals_require_the_asset_manager_role() {
        let admin = Address::unique();
        let stranger = Address::unique();
        let token = Address::unique();

        let mut ledger = TokenLedger::new();
        let vault = Vault::new(VaultKind::ExternalProtection, admin);

        assert_eq!(
            vault.withdraw(&mut ledger, stranger, token, stranger, 1),
            Err(NetworkError::AccessDenied)
        );
    }
}
