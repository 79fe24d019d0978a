use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::account::{dev_signers, Address, Signer};
use crate::error::ConfigError;
use crate::ledger::{Amount, TokenMetadata, DEFAULT_NAME, DEFAULT_SYMBOL};

pub const DEFAULT_TOTAL_SUPPLY: Amount = 1_000_000;
pub const DEFAULT_SEED: &str = "token-dev";
pub const DEFAULT_SIGNER_COUNT: usize = 20;

/// Host configuration, read from a JSON file. Every section and field is
/// optional and falls back to its default.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub token: TokenConfig,
    pub accounts: AccountsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub total_supply: Amount,
    /// Receives the minted supply. Defaults to the deployer.
    pub owner: Option<Address>,
}

impl TokenConfig {
    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            total_supply: DEFAULT_TOTAL_SUPPLY,
            owner: None,
        }
    }
}

/// Deterministic dev accounts available to the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    pub seed: String,
    pub count: usize,
}

impl AccountsConfig {
    pub fn signers(&self) -> Vec<Signer> {
        dev_signers(&self.seed, self.count)
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            count: DEFAULT_SIGNER_COUNT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.total_supply == 0 {
            return Err(ConfigError::Invalid("token.total_supply must be > 0"));
        }
        if self.accounts.count == 0 {
            return Err(ConfigError::Invalid("accounts.count must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.token.total_supply, 1_000_000);
        assert_eq!(config.accounts.signers().len(), DEFAULT_SIGNER_COUNT);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let owner = Address::new([3u8; 20]);
        let raw = format!(
            r#"{{"token": {{"total_supply": 21000000, "owner": "{owner}"}}, "logging": {{"json": true}}}}"#
        );
        let config = Config::from_json(&raw).unwrap();
        assert_eq!(config.token.total_supply, 21_000_000);
        assert_eq!(config.token.owner, Some(owner));
        assert_eq!(config.token.symbol, "MHT");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_supply_is_rejected() {
        let err = Config::from_json(r#"{"token": {"total_supply": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_json(r#"{"token": {"decimals": 18}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
