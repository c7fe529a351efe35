//! Flash Loans
//!
//! Borrow-and-repay-in-one-operation primitive. The recipient callback runs
//! with the network handle while the reentrancy guard is held, so any nested
//! network mutation fails `Reentrant`. The fee is credited to the borrowed
//! side's staked balance once the vault is verified whole again.

use log::debug;

use crate::error::NetworkError;
use crate::math::ppm_of;
use crate::types::{Address, Event, FeeType};

use super::Network;

/// A flash-loan borrower.
///
/// The callback is expected to return `amount + fee_amount` of `token` to the
/// master vault (via [`Network::tokens_mut`]) before returning.
pub trait FlashLoanRecipient {
    /// Ledger address the borrowed funds are delivered to.
    fn address(&self) -> Address;

    /// Invoked mid-operation with the borrowed funds already delivered.
    fn on_flash_loan(
        &mut self,
        network: &mut Network,
        caller: Address,
        token: Address,
        amount: u128,
        fee_amount: u128,
        data: &[u8],
    ) -> Result<(), NetworkError>;
}

impl Network {
    /// Lends `amount` of `token` to `recipient` for the duration of the
    /// callback. Returns the fee collected.
    pub fn flash_loan(
        &mut self,
        caller: Address,
        token: Address,
        amount: u128,
        recipient: &mut dyn FlashLoanRecipient,
        data: &[u8],
    ) -> Result<u128, NetworkError> {
        self.protected(|net| {
            if amount == 0 {
                return Err(NetworkError::ZeroValue);
            }
            let nt = net.nt_token();
            if token != nt {
                if !net.settings.is_whitelisted(token) {
                    return Err(NetworkError::NotWhitelisted);
                }
                // the fee accrues to the pool, so one must exist
                net.collection_index_for(token)?;
            }

            let balance_before = net.master_vault.balance(&net.tokens, token);
            let fee_amount = ppm_of(amount, net.settings.flash_loan_fee_ppm())?;

            net.master_vault.withdraw(
                &mut net.tokens,
                net.address,
                token,
                recipient.address(),
                amount,
            )?;
            debug!("flash loan: {amount} {token} to {}", recipient.address());

            if let Err(error) = recipient.on_flash_loan(net, caller, token, amount, fee_amount, data)
            {
                // claw the borrowed funds back; a recipient that already
                // spent them fails the ledger transfer instead
                let vault = net.master_vault.address();
                net.tokens.transfer(token, recipient.address(), vault, amount)?;
                return Err(error);
            }

            let balance_after = net.master_vault.balance(&net.tokens, token);
            let required = balance_before
                .checked_add(fee_amount)
                .ok_or(NetworkError::Overflow)?;
            if balance_after < required {
                return Err(NetworkError::InsufficientFlashLoanReturn);
            }

            let context_id = net.context_id(caller, "flash_loan", &(token, amount));
            let staked_balance = if token == nt {
                net.master_pool.on_fees_collected(fee_amount)?;
                net.master_pool.nt_staked_balance()
            } else {
                let index = net.collection_index_for(token)?;
                net.collections[index].on_fees_collected(token, fee_amount)?;
                net.pool(token).map(|p| p.staked_balance).unwrap_or(0)
            };

            net.emit(Event::FeesCollected {
                context_id,
                token,
                fee_type: FeeType::FlashLoan,
                amount: fee_amount,
                staked_balance,
            });
            net.emit(Event::FlashLoanCompleted {
                context_id,
                token,
                borrower: recipient.address(),
                amount,
            });
            Ok(fee_amount)
        })
    }
}
