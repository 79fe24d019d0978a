use thiserror::Error;

use crate::account::Address;
use crate::ledger::Amount;

/// Reason string reported when a transfer exceeds the sender's balance.
pub const NOT_ENOUGH_TOKENS: &str = "Not enough tokens";

/// Errors raised by the balance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The sender holds fewer tokens than the transfer amount. The ledger is
    /// left untouched.
    #[error("Not enough tokens")]
    InsufficientBalance {
        account: Address,
        balance: Amount,
        requested: Amount,
    },

    /// A ledger cannot be created without any supply to mint.
    #[error("total supply must be greater than zero")]
    ZeroSupply,

    /// Sum of balances diverged from the recorded total supply.
    #[error("balances sum to {actual:?}, total supply is {expected}")]
    SupplyMismatch {
        expected: Amount,
        /// `None` when the sum itself overflows.
        actual: Option<Amount>,
    },

    /// Zero balances are represented by absence, never stored.
    #[error("zero balance stored for {account}")]
    ZeroBalanceEntry { account: Address },

    /// Snapshot contents do not match the state root it carries.
    #[error("state root mismatch: expected {expected}, computed {computed}")]
    StateRootMismatch { expected: String, computed: String },

    /// Crediting would overflow the balance type.
    #[error("balance overflow crediting {account}")]
    BalanceOverflow { account: Address },
}

impl LedgerError {
    /// Short reason string, in the form contract callers match on.
    pub fn reason(&self) -> String {
        match self {
            LedgerError::InsufficientBalance { .. } => NOT_ENOUGH_TOKENS.to_string(),
            other => other.to_string(),
        }
    }
}

/// Malformed account identifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("invalid address hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Malformed signing key material.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyError {
    #[error("invalid secret key hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("secret key must be 32 bytes, got {0}")]
    Length(usize),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// State file persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state file rejected: {0}")]
    Ledger(#[from] LedgerError),

    #[error("state file {0} already exists")]
    AlreadyExists(String),

    #[error("state file {path} is locked by another process (remove {lock} if it is stale)")]
    Locked { path: String, lock: String },
}
