//! # Pool-Collection Upgrade Tests
//!
//! Migrating pools between collection versions: bit-identical state
//! preservation, routing after the move, batch skip semantics and
//! collection registry management.

mod common;

use borsh::BorshSerialize;
use common::*;
use liquidity_network::{Address, Event, NetworkError};

#[test]
fn upgrade_preserves_the_pool_bit_for_bit() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    let provider = Address::unique();
    let admin = ctx.admin;
    let pool_token = ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);
    ctx.deposit(provider, token, 50_000_000);

    ctx.network.add_pool_collection(admin, POOL_TYPE_STANDARD, 2).unwrap();
    let before = ctx.network.pool(token).unwrap().try_to_vec().unwrap();
    let balance_before = ctx.network.pool_tokens().balance_of(pool_token, provider);
    ctx.network.take_events();

    let upgrades = ctx.network.upgrade_pools(admin, vec![token]).unwrap();
    assert_eq!(upgrades.len(), 1);
    assert_eq!(upgrades[0].from_version, 1);
    assert_eq!(upgrades[0].to_version, 2);

    // the record moved, byte-identical, and the share token kept its identity
    assert_eq!(ctx.network.pool_collection_of(token), Some((POOL_TYPE_STANDARD, 2)));
    let after = ctx.network.pool(token).unwrap();
    assert_eq!(after.try_to_vec().unwrap(), before);
    assert_eq!(after.pool_token, pool_token);
    assert_eq!(
        ctx.network.pool_tokens().balance_of(pool_token, provider),
        balance_before
    );

    let events = ctx.network.take_events();
    assert!(events.iter().any(|e| matches!(e, Event::PoolRemoved { token: t, .. } if *t == token)));
    assert!(events.iter().any(|e| matches!(e, Event::PoolAdded { token: t, .. } if *t == token)));

    // operations keep routing to the pool in its new home
    let minted = ctx.deposit(provider, token, 1_000);
    assert_eq!(minted, 1_000);
    let id = ctx.network.init_withdrawal(provider, pool_token, 1_000).unwrap();
    ctx.advance(7 * 86_400);
    assert!(ctx.network.withdraw(provider, id).is_ok());
}

#[test]
fn batches_skip_pools_with_nowhere_to_go() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);

    // no newer collection registered: the pool is skipped, not failed
    let upgrades = ctx
        .network
        .upgrade_pools(ctx.admin, vec![token, Address::unique()])
        .unwrap();
    assert!(upgrades.is_empty());
    assert_eq!(ctx.network.pool_collection_of(token), Some((POOL_TYPE_STANDARD, 1)));
}

#[test]
fn collection_registry_management() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    let admin = ctx.admin;
    ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);

    assert_eq!(
        ctx.network.add_pool_collection(admin, POOL_TYPE_STANDARD, 1),
        Err(NetworkError::AlreadyExists)
    );

    // v1 still services a pool, so it cannot be removed
    ctx.network.add_pool_collection(admin, POOL_TYPE_STANDARD, 2).unwrap();
    assert_eq!(
        ctx.network.remove_pool_collection(admin, POOL_TYPE_STANDARD, 1, None),
        Err(NetworkError::NotEmpty)
    );

    ctx.network.upgrade_pools(admin, vec![token]).unwrap();

    // an alternative of a different pool type is not a valid replacement
    ctx.network.add_pool_collection(admin, 9, 1).unwrap();
    assert_eq!(
        ctx.network.remove_pool_collection(admin, POOL_TYPE_STANDARD, 1, Some((9, 1))),
        Err(NetworkError::InvalidType)
    );
    assert_eq!(
        ctx.network.remove_pool_collection(admin, POOL_TYPE_STANDARD, 1, Some((POOL_TYPE_STANDARD, 7))),
        Err(NetworkError::DoesNotExist)
    );

    ctx.network
        .remove_pool_collection(admin, POOL_TYPE_STANDARD, 1, Some((POOL_TYPE_STANDARD, 2)))
        .unwrap();
    assert_eq!(
        ctx.network.remove_pool_collection(admin, POOL_TYPE_STANDARD, 1, None),
        Err(NetworkError::DoesNotExist)
    );
    assert_eq!(ctx.network.latest_pool_collection_version(POOL_TYPE_STANDARD), Some(2));
}

#[test]
fn latest_collection_replacement_is_announced() {
    let mut ctx = TestNetwork::new();
    let admin = ctx.admin;
    ctx.network.take_events();

    ctx.network.add_pool_collection(admin, POOL_TYPE_STANDARD, 5).unwrap();
    let events = ctx.network.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::LatestPoolCollectionReplaced { previous_version: 1, new_version: 5, .. }
    )));

    // an older version does not displace the latest
    ctx.network.add_pool_collection(admin, POOL_TYPE_STANDARD, 3).unwrap();
    let events = ctx.network.take_events();
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::LatestPoolCollectionReplaced { .. })));
}
