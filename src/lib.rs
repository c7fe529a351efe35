//! Single-sided AMM liquidity network core.
//!
//! A set of single-sided-exposure liquidity pools pairing a designated
//! network token (NT) against arbitrary base tokens, coordinated by a
//! central [`Network`] facade:
//!
//! - pool accounting: trading liquidity, staked balances and pro-rata pool
//!   tokens ([`pool_collection`], [`pool_token`]);
//! - trade execution: constant-product swaps through the NT with
//!   stable-rate protection and multi-hop routing ([`network`], [`math`]);
//! - withdrawals: time-locked two-phase requests with impermanent-loss
//!   compensation ([`pending_withdrawals`], [`math::withdrawal`]).
//!
//! The host execution environment is injected at the seams: a token ledger
//! ([`token`]), a clock ([`clock`]) and flash-loan recipients
//! ([`network::FlashLoanRecipient`]). All operations are strictly
//! serialized and atomic; reentrant calls from user-controlled callbacks
//! are denied by the facade's guard.

pub mod clock;
pub mod constants;
pub mod error;
pub mod master_pool;
pub mod math;
pub mod network;
pub mod pending_withdrawals;
pub mod pool_collection;
pub mod pool_token;
pub mod state;
pub mod token;
pub mod types;
pub mod upgrader;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorCode, NetworkError};
pub use network::{FlashLoanRecipient, Network};
pub use pool_token::PoolTokenId;
pub use token::Permit;
pub use types::{Address, ContextId, Event, FeeType, Fraction, Role};
pub use vault::VaultKind;
