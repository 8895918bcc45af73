// common/src/models/wallet.rs
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a `0x`-prefixed, hex-encoded 20-byte address.
pub const ADDRESS_TEXT_LEN: usize = 42;

/// Rejection reasons for wallet or contract address text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address must start with 0x and be {ADDRESS_TEXT_LEN} characters long (got {0})")]
    Format(usize),
    #[error("address contains non-hexadecimal characters")]
    NonHex,
}

/// A 20-byte account identifier, stored in its canonical lowercase `0x` form.
///
/// Equality is therefore case-insensitive with respect to the text it was
/// parsed from. The checksummed form is only produced on demand for display
/// and contract calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate and normalise address text of any letter case.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let prefixed = trimmed.starts_with("0x") || trimmed.starts_with("0X");
        if !prefixed || trimmed.len() != ADDRESS_TEXT_LEN {
            return Err(AddressError::Format(trimmed.len()));
        }
        if !trimmed[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::NonHex);
        }
        Ok(Self(format!("0x{}", trimmed[2..].to_ascii_lowercase())))
    }

    /// Canonical lowercase text, also used as the session key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20-byte address
    pub fn to_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        // Validated as 40 hex characters in `parse`
        if hex::decode_to_slice(&self.0[2..], &mut bytes).is_err() {
            tracing::error!("Wallet address {} failed to decode after validation", self.0);
        }
        Address::from(bytes)
    }

    /// EIP-55 mixed-case form used for on-chain calls and display
    pub fn checksummed(&self) -> String {
        self.to_address().to_checksum(None)
    }

    /// Case-insensitive comparison against an already recovered address
    pub fn matches(&self, other: &Address) -> bool {
        self.to_address() == *other
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        Self(format!("0x{}", hex::encode(address.as_slice())))
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(wallet: WalletAddress) -> Self {
        wallet.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
