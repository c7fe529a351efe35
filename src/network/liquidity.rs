//! Deposit and Withdrawal Entry Points
//!
//! Deposits route to the master pool for the network token and to the
//! servicing collection for base tokens, moving the deposited value into the
//! master vault first. Withdrawals complete previously initiated two-phase
//! requests and move the solver's payout out of the vaults.

use log::debug;

use crate::error::NetworkError;
use crate::token::Permit;
use crate::types::{Address, Event, FeeType};

use super::Network;

impl Network {
    /// Deposits `amount` of `token` for the caller.
    ///
    /// Returns the pool tokens minted. `value` is the attached native value
    /// and must equal `amount` exactly when `token` is the native token (and
    /// zero otherwise).
    pub fn deposit(
        &mut self,
        caller: Address,
        token: Address,
        amount: u128,
        value: u128,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| net.deposit_common(caller, caller, token, amount, value))
    }

    /// Deposits on behalf of `provider`: the caller pays, the provider
    /// receives the pool tokens.
    pub fn deposit_for(
        &mut self,
        caller: Address,
        provider: Address,
        token: Address,
        amount: u128,
        value: u128,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| net.deposit_common(caller, provider, token, amount, value))
    }

    /// Deposit carrying a signature-bearing approval instead of a prior
    /// allowance.
    pub fn deposit_permitted(
        &mut self,
        caller: Address,
        token: Address,
        amount: u128,
        permit: &Permit,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| {
            net.apply_permit(token, permit)?;
            net.deposit_common(caller, caller, token, amount, 0)
        })
    }

    /// Permit-funded variant of [`Network::deposit_for`].
    pub fn deposit_for_permitted(
        &mut self,
        caller: Address,
        provider: Address,
        token: Address,
        amount: u128,
        permit: &Permit,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| {
            net.apply_permit(token, permit)?;
            net.deposit_common(caller, provider, token, amount, 0)
        })
    }

    /// Completes a ready withdrawal request. Returns the amount paid out in
    /// the request's reserve token.
    pub fn withdraw(&mut self, caller: Address, id: u64) -> Result<u128, NetworkError> {
        self.protected(|net| {
            // validate without removing, so a failure below leaves the
            // request intact
            let request = net
                .pending_withdrawals
                .withdrawal_request(id)
                .cloned()
                .ok_or(NetworkError::DoesNotExist)?;
            if request.provider != caller {
                return Err(NetworkError::AccessDenied);
            }
            if !net.pending_withdrawals.is_ready(id) {
                return Err(NetworkError::WithdrawalNotAllowed);
            }
            let custody = net.pending_withdrawals.address();
            let context_id = net.context_id(caller, "withdraw", &(id, request.pool_token_amount));

            if request.reserve_token == net.nt_token() {
                let amounts = net.master_pool.withdraw(
                    &mut net.pool_tokens,
                    &mut net.tokens,
                    caller,
                    custody,
                    request.pool_token_amount,
                    net.settings.withdrawal_fee_ppm(),
                )?;
                net.pending_withdrawals.complete_withdrawal(id, caller)?;

                net.emit(Event::NetworkTokenWithdrawn {
                    context_id,
                    provider: caller,
                    nt_amount: amounts.nt_amount,
                    pool_token_amount: request.pool_token_amount,
                    withdrawal_fee: amounts.withdrawal_fee,
                });
                net.emit_total_liquidity(context_id, request.reserve_token);
                return Ok(amounts.nt_amount);
            }

            let token = request.reserve_token;
            let index = net.collection_index_for(token)?;
            if net.master_vault.is_paused() {
                return Err(NetworkError::Paused);
            }
            let vault_balance = net.master_vault.balance(&net.tokens, token);
            // a paused external reserve is simply unavailable to the solver
            let external_balance = if net.external_protection_vault.is_paused() {
                0
            } else {
                net.external_protection_vault.balance(&net.tokens, token)
            };

            let result = net.collections[index].withdraw(
                &mut net.pool_tokens,
                &net.settings,
                token,
                custody,
                request.pool_token_amount,
                vault_balance,
                external_balance,
            )?;
            net.pending_withdrawals.complete_withdrawal(id, caller)?;

            let amounts = result.amounts;
            if amounts.base_from_vault > 0 {
                net.master_vault.withdraw(
                    &mut net.tokens,
                    net.address,
                    token,
                    caller,
                    amounts.base_from_vault,
                )?;
            }
            if amounts.base_from_external_protection > 0 {
                net.external_protection_vault.withdraw(
                    &mut net.tokens,
                    net.address,
                    token,
                    caller,
                    amounts.base_from_external_protection,
                )?;
            }
            if amounts.nt_to_provider > 0 {
                let nt = net.nt_token();
                net.tokens.mint(nt, caller, amounts.nt_to_provider)?;
            }
            if result.nt_renounced_total > 0 {
                net.master_pool.renounce_liquidity(
                    &mut net.tokens,
                    net.master_vault.address(),
                    token,
                    result.nt_renounced_total,
                )?;
            }

            net.emit(Event::BaseTokenWithdrawn {
                context_id,
                token,
                provider: caller,
                base_amount: amounts.base_from_vault,
                external_protection_amount: amounts.base_from_external_protection,
                nt_amount: amounts.nt_to_provider,
                withdrawal_fee: amounts.base_fee,
            });
            if amounts.base_fee > 0 {
                let staked_balance = net.pool(token).map(|p| p.staked_balance).unwrap_or(0);
                net.emit(Event::FeesCollected {
                    context_id,
                    token,
                    fee_type: FeeType::Withdrawal,
                    amount: amounts.base_fee,
                    staked_balance,
                });
            }
            if let Some(pool) = net.pool(token) {
                let (base_liquidity, nt_liquidity) =
                    (pool.base_trading_liquidity, pool.nt_trading_liquidity);
                net.emit_trading_liquidity(context_id, token, base_liquidity, nt_liquidity);
            }
            net.emit_total_liquidity(context_id, token);

            Ok(amounts.base_from_vault + amounts.base_from_external_protection)
        })
    }

    /// Rejects permits for tokens that cannot carry them, then applies the
    /// approval to the ledger.
    fn apply_permit(&mut self, token: Address, permit: &Permit) -> Result<(), NetworkError> {
        if token.is_native() || token == self.nt_token() {
            return Err(NetworkError::PermitUnsupported);
        }
        let now = self.clock.seconds();
        self.tokens.permit(token, permit, now)
    }

    /// One deposit path for both the NT and base-token sides.
    fn deposit_common(
        &mut self,
        payer: Address,
        provider: Address,
        token: Address,
        amount: u128,
        value: u128,
    ) -> Result<u128, NetworkError> {
        if provider.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        if amount == 0 {
            return Err(NetworkError::ZeroValue);
        }
        self.check_value(token, amount, value)?;
        let context_id = self.context_id(payer, "deposit", &(provider, token, amount));

        if token == self.nt_token() {
            let (pool_token_amount, gov_token_amount) = self.master_pool.deposit(
                &mut self.pool_tokens,
                &mut self.tokens,
                payer,
                provider,
                amount,
            )?;
            self.emit(Event::NetworkTokenDeposited {
                context_id,
                provider,
                amount,
                pool_token_amount,
                gov_token_amount,
            });
            self.emit_total_liquidity(context_id, token);
            return Ok(pool_token_amount);
        }

        let index = self.collection_index_for(token)?;
        self.collect_into_master_vault(payer, token, amount)?;
        let deposit = self.collections[index].deposit(
            &mut self.pool_tokens,
            &self.settings,
            &mut self.master_pool,
            &mut self.tokens,
            self.master_vault.address(),
            provider,
            token,
            amount,
        );
        let deposit = match deposit {
            Ok(result) => result,
            Err(error) => {
                // hand the collected funds back; the operation commits nothing
                let vault = self.master_vault.address();
                self.tokens.transfer(token, vault, payer, amount)?;
                return Err(error);
            }
        };
        debug!(
            "deposit: {amount} {token} from {payer} -> {} pool tokens for {provider}",
            deposit.pool_token_amount
        );

        self.emit(Event::BaseTokenDeposited {
            context_id,
            token,
            provider,
            amount,
            pool_token_amount: deposit.pool_token_amount,
        });
        if deposit.nt_liquidity_added > 0 {
            if let Some(pool) = self.pool(token) {
                let (base_liquidity, nt_liquidity) =
                    (pool.base_trading_liquidity, pool.nt_trading_liquidity);
                self.emit_trading_liquidity(context_id, token, base_liquidity, nt_liquidity);
            }
        }
        self.emit_total_liquidity(context_id, token);
        Ok(deposit.pool_token_amount)
    }
}
