use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::account::Address;
use crate::error::LedgerError;

pub type Amount = u128;

pub const DEFAULT_NAME: &str = "My Hardhat Token";
pub const DEFAULT_SYMBOL: &str = "MHT";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub metadata: TokenMetadata,
    pub owner: Address,
    pub total_supply: Amount,
    /// Count of value-moving transfers applied since deployment.
    pub height: u64,
    pub balances: BTreeMap<Address, Amount>,
    #[serde(with = "hex::serde")]
    pub state_root: [u8; 32],
}

impl LedgerSnapshot {
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

/// Account balances of a single fungible token.
///
/// The whole supply is minted to the owner at construction and afterwards
/// only moves between accounts: the sum of all balances always equals
/// [`BalanceLedger::total_supply`]. Accounts without an entry hold zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceLedger {
    metadata: TokenMetadata,
    owner: Address,
    total_supply: Amount,
    height: u64,
    balances: BTreeMap<Address, Amount>,
}

impl BalanceLedger {
    /// Mints `total_supply` to `owner` under the default token metadata.
    pub fn initialize(owner: Address, total_supply: Amount) -> Result<Self, LedgerError> {
        Self::initialize_with_metadata(owner, total_supply, TokenMetadata::default())
    }

    pub fn initialize_with_metadata(
        owner: Address,
        total_supply: Amount,
        metadata: TokenMetadata,
    ) -> Result<Self, LedgerError> {
        if total_supply == 0 {
            return Err(LedgerError::ZeroSupply);
        }
        let mut balances = BTreeMap::new();
        balances.insert(owner, total_supply);
        info!(%owner, total_supply, symbol = %metadata.symbol, "ledger initialized");
        Ok(Self {
            metadata,
            owner,
            total_supply,
            height: 0,
            balances,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Non-zero balances in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, Amount)> + '_ {
        self.balances.iter().map(|(account, balance)| (account, *balance))
    }

    /// Moves `amount` from `sender` to `recipient`.
    ///
    /// Both new balances are computed before either is written, so a
    /// rejected call leaves the ledger exactly as it was.
    pub fn transfer(
        &mut self,
        sender: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let sender_balance = self.balance_of(sender);
        if sender_balance < amount {
            debug!(
                %sender,
                %recipient,
                balance = sender_balance,
                requested = amount,
                "transfer rejected"
            );
            return Err(LedgerError::InsufficientBalance {
                account: *sender,
                balance: sender_balance,
                requested: amount,
            });
        }
        if amount == 0 || sender == recipient {
            return Ok(());
        }

        let debited = sender_balance - amount;
        let credited = self
            .balance_of(recipient)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                account: *recipient,
            })?;

        self.store_balance(*sender, debited);
        self.store_balance(*recipient, credited);
        self.height += 1;
        debug!(%sender, %recipient, amount, height = self.height, "transfer applied");
        debug_assert!(self.check_invariants().is_ok());
        Ok(())
    }

    /// Verifies that balances sum to the total supply and that no zero
    /// entries are stored.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        let mut sum: Option<Amount> = Some(0);
        for (account, balance) in &self.balances {
            if *balance == 0 {
                return Err(LedgerError::ZeroBalanceEntry { account: *account });
            }
            sum = sum.and_then(|acc| acc.checked_add(*balance));
        }
        if sum != Some(self.total_supply) {
            return Err(LedgerError::SupplyMismatch {
                expected: self.total_supply,
                actual: sum,
            });
        }
        Ok(())
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(
            &self.metadata,
            &self.owner,
            self.total_supply,
            self.height,
            &self.balances,
        )
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            metadata: self.metadata.clone(),
            owner: self.owner,
            total_supply: self.total_supply,
            height: self.height,
            balances: self.balances.clone(),
            state_root: self.state_root(),
        }
    }

    /// Rebuilds a ledger from a snapshot after checking its state root and
    /// the supply invariants.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let LedgerSnapshot {
            metadata,
            owner,
            total_supply,
            height,
            balances,
            state_root,
        } = snapshot;
        if total_supply == 0 {
            return Err(LedgerError::ZeroSupply);
        }
        let ledger = Self {
            metadata,
            owner,
            total_supply,
            height,
            balances,
        };
        let computed = ledger.state_root();
        if computed != state_root {
            return Err(LedgerError::StateRootMismatch {
                expected: hex::encode(state_root),
                computed: hex::encode(computed),
            });
        }
        ledger.check_invariants()?;
        Ok(ledger)
    }

    fn store_balance(&mut self, account: Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

fn compute_state_root(
    metadata: &TokenMetadata,
    owner: &Address,
    total_supply: Amount,
    height: u64,
    balances: &BTreeMap<Address, Amount>,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(balances.len() + 1);

    let mut hasher = Sha256::new();
    hasher.update(b"header");
    for field in [&metadata.name, &metadata.symbol] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update(owner.as_bytes());
    hasher.update(total_supply.to_le_bytes());
    hasher.update(height.to_le_bytes());
    leaves.push(hasher.finalize().into());

    for (account, balance) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"acct");
        hasher.update(account.as_bytes());
        hasher.update(balance.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"token-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for pair in leaves.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(left);
            hasher.update(right);
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
