//! Trade Entry Points
//!
//! Routes trades through the network token: a single hop when one side is
//! the NT, two hops (source→NT, NT→target) otherwise. The route executes
//! against the live pool records under snapshots, so a failure anywhere —
//! including the final minimum-return check — restores every touched pool
//! and returns the collected source tokens.

use log::debug;

use crate::error::NetworkError;
use crate::pool_collection::TradeResult;
use crate::state::Pool;
use crate::token::Permit;
use crate::types::{Address, ContextId, Event, FeeType};

use super::Network;

/// One executed hop of a route.
struct HopOutcome {
    /// Base token of the pool the hop ran through
    pool: Address,
    source_token: Address,
    target_token: Address,
    source_amount: u128,
    result: TradeResult,
}

impl Network {
    /// Trades `amount_in` of `source_token` for at least `min_return` of
    /// `target_token`, no later than `deadline`.
    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        &mut self,
        caller: Address,
        source_token: Address,
        target_token: Address,
        amount_in: u128,
        min_return: u128,
        deadline: u32,
        value: u128,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| {
            net.trade_common(caller, source_token, target_token, amount_in, min_return, deadline, value)
        })
    }

    /// Permit-funded variant of [`Network::trade`].
    #[allow(clippy::too_many_arguments)]
    pub fn trade_permitted(
        &mut self,
        caller: Address,
        source_token: Address,
        target_token: Address,
        amount_in: u128,
        min_return: u128,
        deadline: u32,
        permit: &Permit,
    ) -> Result<u128, NetworkError> {
        self.protected(|net| {
            if source_token.is_native() || source_token == net.nt_token() {
                return Err(NetworkError::PermitUnsupported);
            }
            let now = net.clock.seconds();
            net.tokens.permit(source_token, permit, now)?;
            net.trade_common(caller, source_token, target_token, amount_in, min_return, deadline, 0)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn trade_common(
        &mut self,
        caller: Address,
        source_token: Address,
        target_token: Address,
        amount_in: u128,
        min_return: u128,
        deadline: u32,
        value: u128,
    ) -> Result<u128, NetworkError> {
        let now = self.clock.seconds();
        if now > deadline {
            return Err(NetworkError::DeadlineExpired);
        }
        if amount_in == 0 || min_return == 0 {
            return Err(NetworkError::ZeroValue);
        }
        if source_token.is_zero() || target_token.is_zero() {
            return Err(NetworkError::InvalidAddress);
        }
        if source_token == target_token {
            return Err(NetworkError::InvalidToken);
        }
        self.check_value(source_token, amount_in, value)?;
        if self.master_vault.is_paused() {
            return Err(NetworkError::Paused);
        }

        let context_id =
            self.context_id(caller, "trade", &(source_token, target_token, amount_in, min_return));

        // collect first so the route only runs against funded state
        self.collect_into_master_vault(caller, source_token, amount_in)?;

        // snapshot every pool the route can touch
        let nt = self.nt_token();
        let involved: Vec<Address> = [source_token, target_token]
            .into_iter()
            .filter(|t| *t != nt)
            .collect();
        let mut backups: Vec<(Address, Pool)> = Vec::with_capacity(involved.len());
        for token in &involved {
            match self.pool(*token) {
                Some(pool) => backups.push((*token, pool.clone())),
                None => {
                    let vault = self.master_vault.address();
                    self.tokens.transfer(source_token, vault, caller, amount_in)?;
                    return Err(NetworkError::InvalidToken);
                }
            }
        }

        let outcome = self
            .execute_route(source_token, target_token, amount_in, now)
            .and_then(|(amount_out, hops)| {
                if amount_out < min_return {
                    return Err(NetworkError::ReturnAmountTooLow);
                }
                Ok((amount_out, hops))
            });
        let (amount_out, hops) = match outcome {
            Ok(done) => done,
            Err(error) => {
                self.rollback_route(caller, source_token, amount_in, backups)?;
                return Err(error);
            }
        };

        // pay the trader out of the master vault
        self.master_vault
            .withdraw(&mut self.tokens, self.address, target_token, caller, amount_out)?;

        for hop in &hops {
            self.settle_hop_fees(context_id, hop)?;
        }
        for hop in &hops {
            self.emit(Event::TokensTraded {
                context_id,
                trader: caller,
                source_token: hop.source_token,
                target_token: hop.target_token,
                source_amount: hop.source_amount,
                target_amount: hop.result.amount_out,
            });
            if let Some(pool) = self.pool(hop.pool) {
                let (base_liquidity, nt_liquidity) =
                    (pool.base_trading_liquidity, pool.nt_trading_liquidity);
                self.emit_trading_liquidity(context_id, hop.pool, base_liquidity, nt_liquidity);
            }
        }
        debug!("trade: {amount_in} {source_token} -> {amount_out} {target_token} for {caller}");
        Ok(amount_out)
    }

    /// Runs the one- or two-hop route against the live pools.
    fn execute_route(
        &mut self,
        source_token: Address,
        target_token: Address,
        amount_in: u128,
        now: u32,
    ) -> Result<(u128, Vec<HopOutcome>), NetworkError> {
        let nt = self.nt_token();
        let mut hops = Vec::with_capacity(2);

        let amount_out = if source_token == nt {
            let index = self.collection_index_for(target_token)?;
            let result =
                self.collections[index].trade(&self.settings, target_token, true, amount_in, now)?;
            hops.push(HopOutcome {
                pool: target_token,
                source_token: nt,
                target_token,
                source_amount: amount_in,
                result,
            });
            result.amount_out
        } else if target_token == nt {
            let index = self.collection_index_for(source_token)?;
            let result =
                self.collections[index].trade(&self.settings, source_token, false, amount_in, now)?;
            hops.push(HopOutcome {
                pool: source_token,
                source_token,
                target_token: nt,
                source_amount: amount_in,
                result,
            });
            result.amount_out
        } else {
            let index = self.collection_index_for(source_token)?;
            let first =
                self.collections[index].trade(&self.settings, source_token, false, amount_in, now)?;
            hops.push(HopOutcome {
                pool: source_token,
                source_token,
                target_token: nt,
                source_amount: amount_in,
                result: first,
            });
            let index = self.collection_index_for(target_token)?;
            let second = self.collections[index].trade(
                &self.settings,
                target_token,
                true,
                first.amount_out,
                now,
            )?;
            hops.push(HopOutcome {
                pool: target_token,
                source_token: nt,
                target_token,
                source_amount: first.amount_out,
                result: second,
            });
            second.amount_out
        };
        Ok((amount_out, hops))
    }

    /// Restores the snapshotted pools and hands the collected source tokens
    /// back.
    fn rollback_route(
        &mut self,
        caller: Address,
        source_token: Address,
        amount_in: u128,
        backups: Vec<(Address, Pool)>,
    ) -> Result<(), NetworkError> {
        for (token, pool) in backups {
            let index = self.collection_index_for(token)?;
            self.collections[index].restore_pool(token, pool);
        }
        let vault = self.master_vault.address();
        self.tokens.transfer(source_token, vault, caller, amount_in)
    }

    /// Credits the hop's fee to the side it is denominated in and emits the
    /// fee event.
    fn settle_hop_fees(
        &mut self,
        context_id: ContextId,
        hop: &HopOutcome,
    ) -> Result<(), NetworkError> {
        if hop.result.fee_amount == 0 {
            return Ok(());
        }
        if hop.result.fee_to_master_pool {
            self.master_pool.on_fees_collected(hop.result.fee_amount)?;
            let token = self.nt_token();
            let staked_balance = self.master_pool.nt_staked_balance();
            self.emit(Event::FeesCollected {
                context_id,
                token,
                fee_type: FeeType::Trading,
                amount: hop.result.fee_amount,
                staked_balance,
            });
        } else {
            // NT→base hops credit the pool's staked balance inside the hop
            let staked_balance = self.pool(hop.pool).map(|p| p.staked_balance).unwrap_or(0);
            self.emit(Event::FeesCollected {
                context_id,
                token: hop.pool,
                fee_type: FeeType::Trading,
                amount: hop.result.fee_amount,
                staked_balance,
            });
        }
        Ok(())
    }
}
