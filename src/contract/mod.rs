use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::account::{Address, Signer};
use crate::config::TokenConfig;
use crate::error::LedgerError;
use crate::ledger::{Amount, BalanceLedger, LedgerSnapshot};

/// Handle to a deployed token, bound to the account that issues calls.
///
/// Clones share one ledger. Mutations take the write lock for the whole
/// validate-then-apply step; reads take the read lock, so no caller ever
/// observes a half-applied transfer.
#[derive(Clone, Debug)]
pub struct Token {
    ledger: Arc<RwLock<BalanceLedger>>,
    caller: Address,
}

impl Token {
    /// Deploys a fresh ledger. The owner is `config.owner` when set and the
    /// deployer otherwise; the returned handle calls as the deployer.
    pub fn deploy(deployer: &Signer, config: &TokenConfig) -> Result<Self, LedgerError> {
        let owner = config.owner.unwrap_or_else(|| deployer.address());
        let ledger =
            BalanceLedger::initialize_with_metadata(owner, config.total_supply, config.metadata())?;
        info!(deployer = %deployer.address(), %owner, "token deployed");
        Ok(Self::attach(ledger, deployer.address()))
    }

    pub fn attach(ledger: BalanceLedger, caller: Address) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            caller,
        }
    }

    /// Same ledger, calls issued as `caller`.
    pub fn connect(&self, caller: impl Into<Address>) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            caller: caller.into(),
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn owner(&self) -> Address {
        self.ledger.read().owner()
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.read().total_supply()
    }

    pub fn name(&self) -> String {
        self.ledger.read().name().to_string()
    }

    pub fn symbol(&self) -> String {
        self.ledger.read().symbol().to_string()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.read().balance_of(account)
    }

    /// Sends `amount` from the connected caller to `to`.
    pub fn transfer(&self, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.ledger.write().transfer(&self.caller, to, amount)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.read().snapshot()
    }
}
