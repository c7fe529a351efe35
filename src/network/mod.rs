//! Network Facade
//!
//! The single entry point orchestrating the pool collections, the master
//! pool, the vaults and the withdrawal pipeline. Every externally visible
//! operation runs under the reentrancy guard, stamps a context id into the
//! events it emits, and either commits all of its state changes or none.

mod flash_loan;
mod liquidity;
mod trade;

pub use flash_loan::FlashLoanRecipient;

use std::sync::Arc;

use borsh::BorshSerialize;
use log::warn;
use sha2::{Digest, Sha256};

use crate::clock::Clock;
use crate::error::NetworkError;
use crate::master_pool::MasterPool;
use crate::pending_withdrawals::PendingWithdrawals;
use crate::pool_collection::PoolCollection;
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::state::{NetworkSettings, Pool};
use crate::token::TokenLedger;
use crate::types::{Address, ContextId, Event, Role};
use crate::upgrader::{PoolCollectionUpgrader, PoolUpgrade};
use crate::vault::{Vault, VaultKind};

/// The liquidity network core.
pub struct Network {
    address: Address,
    admin: Address,
    clock: Arc<dyn Clock>,
    settings: NetworkSettings,
    tokens: TokenLedger,
    pool_tokens: PoolTokenRegistry,
    master_vault: Vault,
    external_protection_vault: Vault,
    nt_governance_vault: Vault,
    master_pool: MasterPool,
    collections: Vec<PoolCollection>,
    pending_withdrawals: PendingWithdrawals,
    events: Vec<Event>,
    entered: bool,
}

impl Network {
    /// Wires up a network with fresh NT and governance tokens, three vaults
    /// and an empty collection registry. `admin` holds the admin role on
    /// every component; the network itself holds the asset-manager role on
    /// the vaults.
    pub fn new(admin: Address, clock: Arc<dyn Clock>) -> Result<Self, NetworkError> {
        if admin.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        let address = Address::unique();
        let mut pool_tokens = PoolTokenRegistry::new();
        let master_pool = MasterPool::new(&mut pool_tokens, Address::unique(), Address::unique());

        let mut master_vault = Vault::new(VaultKind::Master, admin);
        let mut external_protection_vault = Vault::new(VaultKind::ExternalProtection, admin);
        let mut nt_governance_vault = Vault::new(VaultKind::NtGovernance, admin);
        master_vault.grant_role_unchecked(Role::AssetManager, address);
        external_protection_vault.grant_role_unchecked(Role::AssetManager, address);
        nt_governance_vault.grant_role_unchecked(Role::AssetManager, address);

        Ok(Network {
            address,
            admin,
            clock: clock.clone(),
            settings: NetworkSettings::new(),
            tokens: TokenLedger::new(),
            pool_tokens,
            master_vault,
            external_protection_vault,
            nt_governance_vault,
            master_pool,
            collections: Vec::new(),
            pending_withdrawals: PendingWithdrawals::new(clock),
            events: Vec::new(),
            entered: false,
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn nt_token(&self) -> Address {
        self.master_pool.nt_token()
    }

    pub fn gov_token(&self) -> Address {
        self.master_pool.gov_token()
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    pub fn master_pool(&self) -> &MasterPool {
        &self.master_pool
    }

    pub fn master_vault(&self) -> &Vault {
        &self.master_vault
    }

    pub fn external_protection_vault(&self) -> &Vault {
        &self.external_protection_vault
    }

    pub fn nt_governance_vault(&self) -> &Vault {
        &self.nt_governance_vault
    }

    pub fn pending_withdrawals(&self) -> &PendingWithdrawals {
        &self.pending_withdrawals
    }

    pub fn pool_tokens(&self) -> &PoolTokenRegistry {
        &self.pool_tokens
    }

    /// Host-environment surface: the token ledger the network moves value
    /// through.
    pub fn tokens(&self) -> &TokenLedger {
        &self.tokens
    }

    /// Mutable ledger access for the host environment (funding accounts,
    /// flash-loan repayments).
    pub fn tokens_mut(&mut self) -> &mut TokenLedger {
        &mut self.tokens
    }

    /// The pool record for `token`, wherever it is serviced.
    pub fn pool(&self, token: Address) -> Option<&Pool> {
        self.collections.iter().find_map(|c| c.pool(token))
    }

    /// The collection currently servicing `token`, if any.
    pub fn pool_collection_of(&self, token: Address) -> Option<(u16, u16)> {
        self.collections
            .iter()
            .find(|c| c.has_pool(token))
            .map(|c| (c.pool_type(), c.version()))
    }

    /// Newest registered collection version for `pool_type`.
    pub fn latest_pool_collection_version(&self, pool_type: u16) -> Option<u16> {
        self.collections
            .iter()
            .filter(|c| c.pool_type() == pool_type)
            .map(|c| c.version())
            .max()
    }

    /// Values `pool_token_amount` of `token`'s shares in reserve units.
    pub fn pool_token_to_underlying(
        &self,
        token: Address,
        pool_token_amount: u128,
    ) -> Result<u128, NetworkError> {
        let index = self.collection_index_for(token)?;
        self.collections[index].pool_token_to_underlying(&self.pool_tokens, token, pool_token_amount)
    }

    /// Values `amount` reserve tokens of `token` in shares.
    pub fn underlying_to_pool_token(
        &self,
        token: Address,
        amount: u128,
    ) -> Result<u128, NetworkError> {
        let index = self.collection_index_for(token)?;
        self.collections[index].underlying_to_pool_token(&self.pool_tokens, token, amount)
    }

    /// Events emitted so far, oldest first.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drains the event buffer.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn now(&self) -> u32 {
        self.clock.seconds()
    }

    // ------------------------------------------------------------------
    // Settings administration (role-gated)
    // ------------------------------------------------------------------

    pub fn add_to_whitelist(&mut self, caller: Address, token: Address) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.add_to_whitelist(token)
    }

    pub fn remove_from_whitelist(
        &mut self,
        caller: Address,
        token: Address,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.remove_from_whitelist(token)
    }

    pub fn set_funding_limit(
        &mut self,
        caller: Address,
        token: Address,
        limit: u128,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_funding_limit(token, limit)
    }

    /// Legacy alias of [`Network::set_funding_limit`].
    pub fn set_pool_minting_limit(
        &mut self,
        caller: Address,
        token: Address,
        limit: u128,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_pool_minting_limit(token, limit)
    }

    pub fn set_min_liquidity_for_trading(
        &mut self,
        caller: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_min_liquidity_for_trading(amount);
        Ok(())
    }

    pub fn set_avg_rate_max_deviation_ppm(
        &mut self,
        caller: Address,
        ppm: u32,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_avg_rate_max_deviation_ppm(ppm)
    }

    pub fn set_withdrawal_fee_ppm(&mut self, caller: Address, ppm: u32) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_withdrawal_fee_ppm(ppm)
    }

    pub fn set_flash_loan_fee_ppm(&mut self, caller: Address, ppm: u32) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.settings.set_flash_loan_fee_ppm(ppm)
    }

    pub fn set_lock_duration(&mut self, caller: Address, duration: u32) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.pending_withdrawals.set_lock_duration(duration)
    }

    pub fn set_withdrawal_window_duration(
        &mut self,
        caller: Address,
        duration: u32,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        self.pending_withdrawals.set_withdrawal_window_duration(duration)
    }

    pub fn pause_vault(&mut self, caller: Address, kind: VaultKind) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.vault_mut(kind).pause(caller)
    }

    pub fn unpause_vault(&mut self, caller: Address, kind: VaultKind) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.vault_mut(kind).unpause(caller)
    }

    // ------------------------------------------------------------------
    // Pool-collection management
    // ------------------------------------------------------------------

    /// Registers a new pool collection and, when its version tops the type's
    /// previous latest, makes it the routing target for new pools.
    pub fn add_pool_collection(
        &mut self,
        caller: Address,
        pool_type: u16,
        version: u16,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        if version == 0 {
            return Err(NetworkError::ZeroValue);
        }
        if self
            .collections
            .iter()
            .any(|c| c.pool_type() == pool_type && c.version() == version)
        {
            return Err(NetworkError::AlreadyExists);
        }
        let previous = self.latest_pool_collection_version(pool_type);
        self.collections.push(PoolCollection::new(pool_type, version));

        let context_id = self.context_id(caller, "add_pool_collection", &(pool_type, version));
        self.emit(Event::PoolCollectionAdded { context_id, pool_type, version });
        if previous.map_or(true, |p| version > p) {
            self.emit(Event::LatestPoolCollectionReplaced {
                context_id,
                pool_type,
                previous_version: previous.unwrap_or(0),
                new_version: version,
            });
        }
        Ok(())
    }

    /// Deregisters an empty pool collection.
    ///
    /// An `alternative` collection may be named to take over as the type's
    /// latest; naming one of a different pool type is rejected.
    pub fn remove_pool_collection(
        &mut self,
        caller: Address,
        pool_type: u16,
        version: u16,
        alternative: Option<(u16, u16)>,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        let index = self
            .collections
            .iter()
            .position(|c| c.pool_type() == pool_type && c.version() == version)
            .ok_or(NetworkError::DoesNotExist)?;
        if self.collections[index].pool_count() > 0 {
            return Err(NetworkError::NotEmpty);
        }
        if let Some((alt_type, alt_version)) = alternative {
            if alt_type != pool_type {
                return Err(NetworkError::InvalidType);
            }
            if !self
                .collections
                .iter()
                .any(|c| c.pool_type() == alt_type && c.version() == alt_version)
            {
                return Err(NetworkError::DoesNotExist);
            }
        }
        let previous_latest = self.latest_pool_collection_version(pool_type);
        self.collections.remove(index);

        let context_id = self.context_id(caller, "remove_pool_collection", &(pool_type, version));
        self.emit(Event::PoolCollectionRemoved { context_id, pool_type, version });
        let new_latest = self.latest_pool_collection_version(pool_type);
        if new_latest != previous_latest {
            self.emit(Event::LatestPoolCollectionReplaced {
                context_id,
                pool_type,
                previous_version: previous_latest.unwrap_or(0),
                new_version: new_latest.unwrap_or(0),
            });
        }
        Ok(())
    }

    /// Creates a pool for `token` in the latest collection of `pool_type`.
    pub fn create_pool(
        &mut self,
        caller: Address,
        pool_type: u16,
        token: Address,
    ) -> Result<PoolTokenId, NetworkError> {
        self.protected(|net| {
            net.require_admin(caller)?;
            let latest = net
                .latest_pool_collection_version(pool_type)
                .ok_or(NetworkError::InvalidType)?;
            if net.collections.iter().any(|c| c.has_pool(token)) {
                return Err(NetworkError::AlreadyExists);
            }
            let index = net
                .collections
                .iter()
                .position(|c| c.pool_type() == pool_type && c.version() == latest)
                .ok_or(NetworkError::InvalidPoolCollection)?;
            let pool_token =
                net.collections[index].create_pool(&net.settings, &mut net.pool_tokens, token)?;

            let context_id = net.context_id(caller, "create_pool", &(pool_type, token));
            net.emit(Event::PoolAdded { context_id, pool_type, token });
            Ok(pool_token)
        })
    }

    /// Migrates each pool in the batch to the newest collection of its type.
    ///
    /// Pools that are unknown or already on the newest collection are skipped
    /// rather than failing the batch.
    pub fn upgrade_pools(
        &mut self,
        caller: Address,
        tokens: Vec<Address>,
    ) -> Result<Vec<PoolUpgrade>, NetworkError> {
        self.protected(|net| {
            let context_id = net.context_id(caller, "upgrade_pools", &tokens);
            let mut upgrades = Vec::new();
            for token in tokens {
                match PoolCollectionUpgrader::upgrade_pool(&mut net.collections, token) {
                    Ok(upgrade) => {
                        net.emit(Event::PoolRemoved {
                            context_id,
                            pool_type: upgrade.pool_type,
                            token,
                        });
                        net.emit(Event::PoolAdded {
                            context_id,
                            pool_type: upgrade.pool_type,
                            token,
                        });
                        upgrades.push(upgrade);
                    }
                    Err(
                        error @ (NetworkError::InvalidPool | NetworkError::InvalidPoolCollection),
                    ) => {
                        warn!("skipping upgrade of pool {token}: {error}");
                    }
                    Err(error) => return Err(error),
                }
            }
            Ok(upgrades)
        })
    }

    // ------------------------------------------------------------------
    // Pool administration
    // ------------------------------------------------------------------

    /// Seeds trading liquidity at a virtual rate and opens trading.
    pub fn enable_trading(
        &mut self,
        caller: Address,
        token: Address,
        nt_virtual_rate: u128,
        base_virtual_rate: u128,
    ) -> Result<(), NetworkError> {
        self.protected(|net| {
            net.require_admin(caller)?;
            let now = net.clock.seconds();
            let index = net.collection_index_for(token)?;
            let available = net.master_pool.available_funding(&net.settings, token);
            let (nt_bootstrap, base_bootstrap) = net.collections[index].enable_trading(
                &net.settings,
                token,
                nt_virtual_rate,
                base_virtual_rate,
                available,
                now,
            )?;
            net.master_pool.request_liquidity(
                &mut net.tokens,
                &net.settings,
                net.master_vault.address(),
                token,
                nt_bootstrap,
            )?;

            let context_id =
                net.context_id(caller, "enable_trading", &(token, nt_virtual_rate, base_virtual_rate));
            net.emit_trading_liquidity(context_id, token, base_bootstrap, nt_bootstrap);
            Ok(())
        })
    }

    /// Shuts trading down for `token` and renounces its NT liquidity.
    pub fn disable_trading(&mut self, caller: Address, token: Address) -> Result<(), NetworkError> {
        self.protected(|net| {
            net.require_admin(caller)?;
            let index = net.collection_index_for(token)?;
            let renounced = net.collections[index].disable_trading(token)?;
            net.master_pool.renounce_liquidity(
                &mut net.tokens,
                net.master_vault.address(),
                token,
                renounced,
            )?;

            let context_id = net.context_id(caller, "disable_trading", &token);
            net.emit_trading_liquidity(context_id, token, 0, 0);
            Ok(())
        })
    }

    pub fn set_trading_fee_ppm(
        &mut self,
        caller: Address,
        token: Address,
        fee_ppm: u32,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        let index = self.collection_index_for(token)?;
        self.collections[index].set_trading_fee_ppm(token, fee_ppm)
    }

    pub fn set_depositing_enabled(
        &mut self,
        caller: Address,
        token: Address,
        enabled: bool,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        let index = self.collection_index_for(token)?;
        self.collections[index].set_depositing_enabled(token, enabled)
    }

    pub fn set_deposit_limit(
        &mut self,
        caller: Address,
        token: Address,
        limit: u128,
    ) -> Result<(), NetworkError> {
        self.ensure_not_entered()?;
        self.require_admin(caller)?;
        let index = self.collection_index_for(token)?;
        self.collections[index].set_deposit_limit(token, limit)
    }

    // ------------------------------------------------------------------
    // Withdrawal lifecycle entry points
    // ------------------------------------------------------------------

    /// Opens a two-phase withdrawal: the caller's pool tokens move into
    /// custody and the lock starts.
    pub fn init_withdrawal(
        &mut self,
        caller: Address,
        pool_token: PoolTokenId,
        pool_token_amount: u128,
    ) -> Result<u64, NetworkError> {
        self.protected(|net| {
            net.pending_withdrawals.init_withdrawal(
                &mut net.pool_tokens,
                caller,
                pool_token,
                pool_token_amount,
            )
        })
    }

    /// Returns custodied pool tokens to the caller and closes the request.
    pub fn cancel_withdrawal(&mut self, caller: Address, id: u64) -> Result<(), NetworkError> {
        self.protected(|net| {
            net.pending_withdrawals
                .cancel_withdrawal(&mut net.pool_tokens, id, caller)
        })
    }

    // ------------------------------------------------------------------
    // Internals shared by the operation modules
    // ------------------------------------------------------------------

    /// Mutating admin surfaces that skip the full guard still refuse to run
    /// inside another operation.
    fn ensure_not_entered(&self) -> Result<(), NetworkError> {
        if self.entered {
            return Err(NetworkError::Reentrant);
        }
        Ok(())
    }

    fn require_admin(&self, caller: Address) -> Result<(), NetworkError> {
        if caller != self.admin {
            return Err(NetworkError::AccessDenied);
        }
        Ok(())
    }

    /// Runs `f` under the reentrancy guard; nested entry fails `Reentrant`.
    fn protected<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, NetworkError>,
    ) -> Result<R, NetworkError> {
        if self.entered {
            return Err(NetworkError::Reentrant);
        }
        self.entered = true;
        let result = f(self);
        self.entered = false;
        result
    }

    /// Hashes `(sender, time, operation, params)` into the correlation id
    /// stamped on this operation's events.
    fn context_id<P: BorshSerialize>(&self, sender: Address, operation: &str, params: &P) -> ContextId {
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(self.clock.seconds().to_le_bytes());
        hasher.update(operation.as_bytes());
        if let Ok(bytes) = params.try_to_vec() {
            hasher.update(&bytes);
        }
        ContextId(hasher.finalize().into())
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Emits the per-side trading-liquidity pair for `token`'s pool.
    fn emit_trading_liquidity(
        &mut self,
        context_id: ContextId,
        token: Address,
        base_liquidity: u128,
        nt_liquidity: u128,
    ) {
        let nt_token = self.nt_token();
        self.emit(Event::TradingLiquidityUpdated {
            context_id,
            pool: token,
            token,
            liquidity: base_liquidity,
        });
        self.emit(Event::TradingLiquidityUpdated {
            context_id,
            pool: token,
            token: nt_token,
            liquidity: nt_liquidity,
        });
    }

    /// Emits the staked/vault totals for `token` after a liquidity change.
    fn emit_total_liquidity(&mut self, context_id: ContextId, token: Address) {
        let (staked_balance, pool_token_supply) = if token == self.nt_token() {
            (
                self.master_pool.nt_staked_balance(),
                self.pool_tokens.total_supply(self.master_pool.pool_token()),
            )
        } else {
            match self.pool(token) {
                Some(pool) => (pool.staked_balance, self.pool_tokens.total_supply(pool.pool_token)),
                None => return,
            }
        };
        let liquidity = self.master_vault.balance(&self.tokens, token);
        self.emit(Event::TotalLiquidityUpdated {
            context_id,
            token,
            liquidity,
            staked_balance,
            pool_token_supply,
        });
    }

    fn collection_index_for(&self, token: Address) -> Result<usize, NetworkError> {
        self.collections
            .iter()
            .position(|c| c.has_pool(token))
            .ok_or(NetworkError::InvalidToken)
    }

    fn vault_mut(&mut self, kind: VaultKind) -> &mut Vault {
        match kind {
            VaultKind::Master => &mut self.master_vault,
            VaultKind::ExternalProtection => &mut self.external_protection_vault,
            VaultKind::NtGovernance => &mut self.nt_governance_vault,
        }
    }

    /// Validates the attached native value against the token being moved.
    fn check_value(&self, token: Address, amount: u128, value: u128) -> Result<(), NetworkError> {
        let expected = if token.is_native() { amount } else { 0 };
        if value != expected {
            return Err(NetworkError::EthAmountMismatch);
        }
        Ok(())
    }

    /// Pulls `amount` of `token` from `payer` into the master vault, via
    /// native value transfer or allowance.
    fn collect_into_master_vault(
        &mut self,
        payer: Address,
        token: Address,
        amount: u128,
    ) -> Result<(), NetworkError> {
        let vault = self.master_vault.address();
        if token.is_native() {
            self.tokens.transfer(token, payer, vault, amount)
        } else {
            self.tokens.transfer_from(token, self.address, payer, vault, amount)
        }
    }
}
