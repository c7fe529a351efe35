//! Pool-Collection Upgrader
//!
//! Moves a pool's record from the collection currently servicing it to the
//! newest registered collection of the same type. The move is a detach /
//! attach of the borsh-serializable [`crate::state::Pool`] record, so every
//! field survives bit-identically and the pool token keeps its identity.

use log::debug;

use crate::error::NetworkError;
use crate::pool_collection::PoolCollection;
use crate::types::Address;

/// Outcome of one pool migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUpgrade {
    pub pool_type: u16,
    pub from_version: u16,
    pub to_version: u16,
}

/// Stateless migration driver over the network's registered collections.
#[derive(Debug, Default)]
pub struct PoolCollectionUpgrader;

impl PoolCollectionUpgrader {
    /// Migrates `token`'s pool into the newest collection of its type.
    ///
    /// Fails with `InvalidPool` when no collection services the token and
    /// `InvalidPoolCollection` when there is no strictly newer destination.
    pub fn upgrade_pool(
        collections: &mut [PoolCollection],
        token: Address,
    ) -> Result<PoolUpgrade, NetworkError> {
        let source = collections
            .iter()
            .position(|c| c.has_pool(token))
            .ok_or(NetworkError::InvalidPool)?;
        let pool_type = collections[source].pool_type();
        let from_version = collections[source].version();

        let destination = collections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.pool_type() == pool_type && c.version() > from_version)
            .max_by_key(|(_, c)| c.version())
            .map(|(i, _)| i)
            .ok_or(NetworkError::InvalidPoolCollection)?;
        if collections[destination].has_pool(token) {
            return Err(NetworkError::InvalidPoolCollection);
        }

        let to_version = collections[destination].version();
        let pool = collections[source].migrate_out(token)?;
        collections[destination].migrate_in(token, pool)?;
        debug!("pool {token} upgraded v{from_version} -> v{to_version} (type {pool_type})");
        Ok(PoolUpgrade { pool_type, from_version, to_version })
    }
}
