//! Shared Types
//!
//! Addresses, rate fractions, roles and the event vocabulary used across the
//! network components.

use borsh::{BorshDeserialize, BorshSerialize};

pub mod address;
pub mod events;
pub mod fraction;

pub use address::Address;
pub use events::{ContextId, Event, FeeType};
pub use fraction::Fraction;

/// Flat capability set gating privileged operations.
///
/// Roles are held per component; there is no hierarchy. Grants are persistent
/// until explicitly revoked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub enum Role {
    Admin,
    AssetManager,
    NetworkTokenManager,
    PoolCollectionManager,
    MigrationManager,
    Minter,
}
