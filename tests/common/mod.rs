//! # Shared Test Harness
//!
//! Scenario helpers for the integration tests: a network wired to a manual
//! clock, funded users, and shortcuts for standing up pools in the states
//! the tests need.

#![allow(dead_code)]

use std::sync::Arc;

use liquidity_network::{Address, ManualClock, Network, PoolTokenId};

/// The standard pool type registered by the harness.
pub const POOL_TYPE_STANDARD: u16 = 1;

/// Default funding limit granted to pools created via the harness.
pub const DEFAULT_FUNDING_LIMIT: u128 = 10_000_000;

/// Bootstrap NT liquidity (the default trading floor).
pub const BOOTSTRAP_LIQUIDITY: u128 = 10_000;

pub struct TestNetwork {
    pub network: Network,
    pub clock: Arc<ManualClock>,
    pub admin: Address,
}

impl TestNetwork {
    /// A network with one standard collection (v1) registered.
    pub fn new() -> Self {
        init_logging();
        let clock = Arc::new(ManualClock::starting_at(1_000_000));
        let admin = Address::unique();
        let mut network = Network::new(admin, clock.clone()).expect("network construction");
        network
            .add_pool_collection(admin, POOL_TYPE_STANDARD, 1)
            .expect("register standard collection");
        network.take_events();
        TestNetwork { network, clock, admin }
    }

    /// Whitelists `token`, grants it a funding limit and creates its pool.
    pub fn create_pool(&mut self, token: Address, funding_limit: u128) -> PoolTokenId {
        let admin = self.admin;
        self.network.add_to_whitelist(admin, token).unwrap();
        self.network.set_funding_limit(admin, token, funding_limit).unwrap();
        self.network
            .create_pool(admin, POOL_TYPE_STANDARD, token)
            .unwrap()
    }

    /// Mints `amount` of `token` to `user` and approves the network to
    /// spend it.
    pub fn fund(&mut self, user: Address, token: Address, amount: u128) {
        let spender = self.network.address();
        self.network.tokens_mut().mint(token, user, amount).unwrap();
        let current = self.network.tokens().allowance(token, user, spender);
        self.network
            .tokens_mut()
            .approve(token, user, spender, current + amount);
    }

    /// Funds `user` and deposits in one step; returns the pool tokens minted.
    pub fn deposit(&mut self, user: Address, token: Address, amount: u128) -> u128 {
        self.fund(user, token, amount);
        self.network.deposit(user, token, amount, 0).unwrap()
    }

    /// Stands up a pool with live trading at a 1:1 virtual rate and
    /// `depth + BOOTSTRAP_LIQUIDITY` on each side of the curve.
    ///
    /// Returns `(token, pool_token, provider)`.
    pub fn trading_pool(&mut self, depth: u128) -> (Address, PoolTokenId, Address) {
        let token = Address::unique();
        let provider = Address::unique();
        let pool_token = self.create_pool(token, DEFAULT_FUNDING_LIMIT);
        self.deposit(provider, token, BOOTSTRAP_LIQUIDITY);
        let admin = self.admin;
        self.network.enable_trading(admin, token, 1, 1).unwrap();
        if depth > 0 {
            self.deposit(provider, token, depth);
        }
        self.network.take_events();
        (token, pool_token, provider)
    }

    pub fn advance(&self, seconds: u32) {
        self.clock.advance(seconds);
    }

    /// Master-vault balance of `token`.
    pub fn vault_balance(&self, token: Address) -> u128 {
        self.network.master_vault().balance(self.network.tokens(), token)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
