//! Address Type
//!
//! 20-byte account/token identifiers used across the network. The host chain
//! assigns real addresses; the core only compares, stores and displays them.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A 20-byte account or token address.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize, BorshDeserialize,
)]
pub struct Address(pub [u8; 20]);

/// Monotonic source for locally generated unique addresses.
static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

impl Address {
    /// The zero address; never a valid participant or token.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Sentinel address representing the native chain token (`0xEEEE…EE`).
    pub const NATIVE: Address = Address([0xEE; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Generates a fresh, process-unique address.
    pub fn unique() -> Self {
        let n = NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; 20];
        bytes[12..20].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}
