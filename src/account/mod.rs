use std::fmt;
use std::str::FromStr;

use ed25519_dalek::SigningKey;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{AddressError, KeyError};

pub const ADDRESS_LEN: usize = 20;

const DEV_SIGNER_DOMAIN: &[u8] = b"token-dev-signer";

/// Opaque account identifier keyed into the balance table.
///
/// Rendered as `0x` followed by 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Address of an ed25519 verifying key: the trailing 20 bytes of its
    /// SHA-256 digest.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest: [u8; 32] = Sha256::digest(public_key).into();
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
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
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An ed25519 key pair acting as a caller identity.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    address: Address,
}

impl Signer {
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&secret);
        let address = Address::from_public_key(key.verifying_key().as_bytes());
        Self { key, address }
    }

    /// Parses a 32-byte secret key given as 64 hex characters.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, KeyError> {
        let raw = hex::decode(secret_hex.trim())?;
        let secret: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(raw.len()))?;
        Ok(Self::from_secret_bytes(secret))
    }

    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        Self::from_secret_bytes(secret)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl From<&Signer> for Address {
    fn from(signer: &Signer) -> Self {
        signer.address
    }
}

/// Deterministic signer list derived from `seed`, so every run of the host
/// and of the tests sees the same accounts in the same order.
pub fn dev_signers(seed: &str, count: usize) -> Vec<Signer> {
    (0..count)
        .map(|idx| {
            let mut hasher = Sha256::new();
            hasher.update(DEV_SIGNER_DOMAIN);
            hasher.update(seed.as_bytes());
            hasher.update((idx as u32).to_le_bytes());
            Signer::from_secret_bytes(hasher.finalize().into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn address_display_round_trips() {
        let addr = Address::new([0xab; ADDRESS_LEN]);
        let rendered = addr.to_string();
        assert_eq!(rendered.len(), 2 + 2 * ADDRESS_LEN);
        assert!(rendered.starts_with("0xabab"));
        assert_eq!(rendered.parse::<Address>().unwrap(), addr);
        let upper = format!("0x{}", hex::encode_upper(addr.as_bytes()));
        assert_eq!(upper.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_parse_rejects_bad_input() {
        assert_eq!(
            "abab".parse::<Address>().unwrap_err(),
            AddressError::MissingPrefix
        );
        assert!(matches!(
            "0x1234".parse::<Address>().unwrap_err(),
            AddressError::Hex(_)
        ));
        assert!(matches!(
            format!("0x{}", "zz".repeat(ADDRESS_LEN))
                .parse::<Address>()
                .unwrap_err(),
            AddressError::Hex(_)
        ));
    }

    #[test]
    fn address_serializes_as_string() {
        let addr = Address::new([7u8; ADDRESS_LEN]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn dev_signers_are_deterministic_and_distinct() {
        let a = dev_signers("token-dev", 5);
        let b = dev_signers("token-dev", 5);
        let addrs_a: Vec<_> = a.iter().map(Signer::address).collect();
        let addrs_b: Vec<_> = b.iter().map(Signer::address).collect();
        assert_eq!(addrs_a, addrs_b);
        let unique: BTreeSet<_> = addrs_a.iter().collect();
        assert_eq!(unique.len(), 5);

        let other = dev_signers("other-seed", 1);
        assert_ne!(other[0].address(), a[0].address());
    }

    #[test]
    fn secret_hex_round_trips() {
        let mut rng = StdRng::seed_from_u64(42);
        let signer = Signer::generate(&mut rng);
        let restored = Signer::from_secret_hex(&signer.secret_key_hex()).unwrap();
        assert_eq!(restored.address(), signer.address());
        assert_eq!(restored.public_key_hex(), signer.public_key_hex());
    }

    #[test]
    fn secret_hex_rejects_wrong_length() {
        assert_eq!(
            Signer::from_secret_hex("abcd").unwrap_err(),
            KeyError::Length(2)
        );
        assert!(matches!(
            Signer::from_secret_hex("xyz").unwrap_err(),
            KeyError::Hex(_)
        ));
    }
}
