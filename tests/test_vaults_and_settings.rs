//! # Settings, Permit and Trading-Enablement Tests
//!
//! Validated admin setters, role gating, permit-funded operations, native
//! token handling and the trading-enablement preconditions.

mod common;

use common::*;
use liquidity_network::{
    Address, ErrorCode, NetworkError, Permit, VaultKind,
};

fn permit_for(ctx: &TestNetwork, owner: Address, value: u128, deadline: u32) -> Permit {
    Permit {
        owner,
        spender: ctx.network.address(),
        value,
        deadline,
        signature: vec![0x1b; 65],
    }
}

#[test]
fn settings_setters_validate_their_domain() {
    let mut ctx = TestNetwork::new();
    let admin = ctx.admin;
    let token = Address::unique();

    assert_eq!(
        ctx.network.set_withdrawal_fee_ppm(admin, 1_000_001),
        Err(NetworkError::InvalidFee { fee_ppm: 1_000_001 })
    );
    assert_eq!(
        ctx.network.set_funding_limit(admin, token, 1_000),
        Err(NetworkError::NotWhitelisted)
    );

    ctx.network.add_to_whitelist(admin, token).unwrap();
    assert_eq!(
        ctx.network.add_to_whitelist(admin, token),
        Err(NetworkError::AlreadyExists)
    );

    // the legacy minting-limit alias reads and writes the funding slot
    ctx.network.set_pool_minting_limit(admin, token, 77_000).unwrap();
    assert_eq!(ctx.network.settings().funding_limit(token), 77_000);
    assert_eq!(ctx.network.settings().pool_minting_limit(token), 77_000);

    ctx.network.remove_from_whitelist(admin, token).unwrap();
    assert_eq!(
        ctx.network.remove_from_whitelist(admin, token),
        Err(NetworkError::DoesNotExist)
    );
}

#[test]
fn admin_surfaces_reject_strangers() {
    let mut ctx = TestNetwork::new();
    let stranger = Address::unique();
    let token = Address::unique();

    assert_eq!(
        ctx.network.add_to_whitelist(stranger, token),
        Err(NetworkError::AccessDenied)
    );
    assert_eq!(
        ctx.network.set_flash_loan_fee_ppm(stranger, 1),
        Err(NetworkError::AccessDenied)
    );
    assert_eq!(
        ctx.network.set_lock_duration(stranger, 1),
        Err(NetworkError::AccessDenied)
    );
    assert_eq!(
        ctx.network.pause_vault(stranger, VaultKind::Master),
        Err(NetworkError::AccessDenied)
    );
    assert_eq!(
        ctx.network.add_pool_collection(stranger, 2, 1),
        Err(NetworkError::AccessDenied)
    );
}

#[test]
fn permit_funded_deposits() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    let user = Address::unique();
    ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);

    // funds without a prior allowance; the permit carries the approval
    ctx.network.tokens_mut().mint(token, user, 5_000).unwrap();
    let deadline = ctx.network.now() + 100;
    let permit = permit_for(&ctx, user, 5_000, deadline);
    let minted = ctx.network.deposit_permitted(user, token, 5_000, &permit).unwrap();
    assert_eq!(minted, 5_000);

    // permits never apply to the native token or the NT
    let nt = ctx.network.nt_token();
    let permit = permit_for(&ctx, user, 1, deadline);
    assert_eq!(
        ctx.network.deposit_permitted(user, Address::NATIVE, 1, &permit),
        Err(NetworkError::PermitUnsupported)
    );
    assert_eq!(
        ctx.network.deposit_permitted(user, nt, 1, &permit),
        Err(NetworkError::PermitUnsupported)
    );

    // stale permits are rejected before any funds move
    ctx.advance(200);
    let expired = permit_for(&ctx, user, 1_000, deadline);
    ctx.network.tokens_mut().mint(token, user, 1_000).unwrap();
    assert_eq!(
        ctx.network.deposit_permitted(user, token, 1_000, &expired),
        Err(NetworkError::DeadlineExpired)
    );
}

#[test]
fn native_token_deposits_carry_value() {
    let mut ctx = TestNetwork::new();
    let user = Address::unique();
    ctx.create_pool(Address::NATIVE, DEFAULT_FUNDING_LIMIT);
    ctx.network.tokens_mut().mint(Address::NATIVE, user, 10_000).unwrap();

    // declared value must match the amount exactly
    assert_eq!(
        ctx.network.deposit(user, Address::NATIVE, 4_000, 3_999),
        Err(NetworkError::EthAmountMismatch)
    );
    let minted = ctx.network.deposit(user, Address::NATIVE, 4_000, 4_000).unwrap();
    assert_eq!(minted, 4_000);
    assert_eq!(ctx.vault_balance(Address::NATIVE), 4_000);
}

#[test]
fn trading_enablement_preconditions() {
    let mut ctx = TestNetwork::new();
    let admin = ctx.admin;
    let provider = Address::unique();

    // funding limit below the trading floor
    let starved = Address::unique();
    ctx.create_pool(starved, 5_000);
    ctx.deposit(provider, starved, 20_000);
    assert_eq!(
        ctx.network.enable_trading(admin, starved, 1, 1),
        Err(NetworkError::NetworkLiquidityDisabled)
    );

    // staked balance below the derived base bootstrap
    let shallow = Address::unique();
    ctx.create_pool(shallow, DEFAULT_FUNDING_LIMIT);
    ctx.deposit(provider, shallow, 5_000);
    assert!(matches!(
        ctx.network.enable_trading(admin, shallow, 1, 1),
        Err(NetworkError::InsufficientFunds { .. })
    ));

    // zero virtual rates are meaningless
    assert_eq!(
        ctx.network.enable_trading(admin, shallow, 0, 1),
        Err(NetworkError::ZeroValue)
    );

    let (token, _, _) = ctx.trading_pool(0);
    assert_eq!(
        ctx.network.enable_trading(admin, token, 1, 1),
        Err(NetworkError::AlreadyExists)
    );
}

#[test]
fn disabling_trading_renounces_the_nt_side() {
    let mut ctx = TestNetwork::new();
    let admin = ctx.admin;
    let (token, _, _) = ctx.trading_pool(100_000);
    let nt = ctx.network.nt_token();
    let vault = ctx.network.master_vault().address();
    assert_eq!(ctx.network.tokens().balance_of(nt, vault), 110_000);

    ctx.network.disable_trading(admin, token).unwrap();
    let pool = ctx.network.pool(token).unwrap();
    assert!(!pool.trading_enabled);
    assert_eq!(pool.base_trading_liquidity, 0);
    assert_eq!(pool.nt_trading_liquidity, 0);
    assert_eq!(ctx.network.master_pool().minted_for(token), 0);
    assert_eq!(ctx.network.tokens().balance_of(nt, vault), 0);

    assert_eq!(
        ctx.network.disable_trading(admin, token),
        Err(NetworkError::TradingDisabled)
    );
}

#[test]
fn context_ids_join_an_operation_and_separate_operations() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    let provider = Address::unique();
    ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);
    ctx.network.take_events();

    ctx.deposit(provider, token, 1_000);
    let first: Vec<_> = ctx.network.take_events();
    ctx.advance(1);
    ctx.deposit(provider, token, 1_000);
    let second: Vec<_> = ctx.network.take_events();

    let id_of = |events: &[liquidity_network::Event]| match &events[0] {
        liquidity_network::Event::BaseTokenDeposited { context_id, .. } => *context_id,
        other => panic!("unexpected first event: {other:?}"),
    };
    let first_id = id_of(&first);
    let second_id = id_of(&second);
    assert_ne!(first_id, second_id);

    // every event of one operation shares its id
    for event in &first {
        let id = match event {
            liquidity_network::Event::BaseTokenDeposited { context_id, .. } => *context_id,
            liquidity_network::Event::TotalLiquidityUpdated { context_id, .. } => *context_id,
            other => panic!("unexpected event in deposit: {other:?}"),
        };
        assert_eq!(id, first_id);
    }
}

#[test]
fn governance_vault_is_pausable_like_the_others() {
    let mut ctx = TestNetwork::new();
    let admin = ctx.admin;
    ctx.network.pause_vault(admin, VaultKind::NtGovernance).unwrap();
    assert!(ctx.network.nt_governance_vault().is_paused());
    ctx.network.unpause_vault(admin, VaultKind::NtGovernance).unwrap();
    assert!(!ctx.network.nt_governance_vault().is_paused());
}

/// The share/underlying conversion views track fee accrual: once the staked
/// balance outgrows the supply, a share is worth more than one reserve unit.
#[test]
fn share_conversions_follow_the_staked_balance() {
    let mut ctx = TestNetwork::new();
    let token = Address::unique();
    let provider = Address::unique();
    let admin = ctx.admin;
    ctx.create_pool(token, DEFAULT_FUNDING_LIMIT);
    ctx.deposit(provider, token, 100_000);

    assert_eq!(ctx.network.pool_token_to_underlying(token, 50_000).unwrap(), 50_000);
    assert_eq!(ctx.network.underlying_to_pool_token(token, 50_000).unwrap(), 50_000);

    // accrue 1_000 of flash-loan fees into the staked balance
    ctx.network.set_flash_loan_fee_ppm(admin, 10_000).unwrap();
    let mut borrower = FeePayer { address: Address::unique() };
    ctx.fund(borrower.address, token, 1_000);
    ctx.network
        .flash_loan(Address::unique(), token, 100_000, &mut borrower, &[])
        .unwrap();

    // 50_000 shares of a 100_000-share supply now claim half of 101_000
    assert_eq!(ctx.network.pool_token_to_underlying(token, 50_000).unwrap(), 50_500);
    assert_eq!(ctx.network.underlying_to_pool_token(token, 50_500).unwrap(), 50_000);
}

struct FeePayer {
    address: Address,
}

impl liquidity_network::FlashLoanRecipient for FeePayer {
    fn address(&self) -> Address {
        self.address
    }

    fn on_flash_loan(
        &mut self,
        network: &mut liquidity_network::Network,
        _caller: Address,
        token: Address,
        amount: u128,
        fee_amount: u128,
        _data: &[u8],
    ) -> Result<(), NetworkError> {
        let vault = network.master_vault().address();
        network
            .tokens_mut()
            .transfer(token, self.address, vault, amount + fee_amount)
    }
}

#[test]
fn error_codes_are_stable_and_reversible() {
    assert_eq!(NetworkError::Overflow.error_code(), 1026);
    assert_eq!(NetworkError::Reentrant.error_code(), 1027);
    assert_eq!(
        NetworkError::InsufficientFunds { required: 5, available: 1 }.error_code(),
        1013
    );
    assert_eq!(ErrorCode::from_code(1026), Some(ErrorCode::Overflow));
    assert_eq!(ErrorCode::from_code(999), None);
}
