//! Fungible token ledger.
//!
//! The crate is split into a small core and the host around it:
//!
//! * [`ledger`]: the balance table. Owner-minted supply, balance lookups and
//!   atomic transfers under the conservation invariant.
//! * [`account`]: account addresses and ed25519 signers, including the
//!   deterministic dev signer list.
//! * [`contract`]: a thread-safe handle to a deployed token that supplies
//!   the caller identity for transfers.
//! * [`config`], [`store`], [`logging`]: configuration, state file
//!   persistence and tracing setup used by the `token` binary.

pub mod account;
pub mod config;
pub mod contract;
pub mod ledger;
pub mod logging;
pub mod store;

mod error;

pub use account::{dev_signers, Address, Signer};
pub use contract::Token;
pub use error::{
    AddressError, ConfigError, KeyError, LedgerError, StoreError, NOT_ENOUGH_TOKENS,
};
pub use ledger::{Amount, BalanceLedger, LedgerSnapshot, TokenMetadata};
