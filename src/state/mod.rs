//! Persisted State Records
//!
//! Every record here derives borsh serialization; the byte layout is the
//! versioned persistence format and the migration wire format.

pub mod pool;
pub mod settings;
pub mod withdrawal;

pub use pool::{AverageRate, Pool, ReserveProduct};
pub use settings::NetworkSettings;
pub use withdrawal::{RequestStatus, WithdrawalRequest};
