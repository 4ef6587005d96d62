//! Ethereum address representation and EIP-55 rendering.

use std::fmt;
use std::str::FromStr;

use tiny_keccak::{Hasher, Keccak};

/// An Ethereum address (20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Creates an address from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the address as raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the address as a lowercase hex string (without 0x prefix).
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the address with 0x prefix.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    /// Returns the 40-character EIP-55 body (mixed case, without 0x prefix).
    pub fn checksum_body(&self) -> String {
        let lower = self.to_hex();
        let hash = keccak256(lower.as_bytes());

        lower
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let hash_byte = hash[i / 2];
                let nibble = if i % 2 == 0 {
                    hash_byte >> 4
                } else {
                    hash_byte & 0x0f
                };

                if c.is_ascii_alphabetic() && nibble >= 8 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    }

    /// Returns the address with checksum encoding (EIP-55).
    pub fn to_checksum(&self) -> String {
        format!("0x{}", self.checksum_body())
    }

    /// Checks whether `s` is this address's exact EIP-55 rendering.
    ///
    /// All-lowercase and all-uppercase strings carry no checksum and are
    /// accepted as long as the hex value parses.
    pub fn is_valid_checksum(s: &str) -> bool {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let Ok(address) = body.parse::<Address>() else {
            return false;
        };

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if !(has_lower && has_upper) {
            return true;
        }

        address.checksum_body() == body
    }
}

/// Keccak-256 of `data`.
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Error returned when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAddressError {
    #[error("Address must be 40 hex characters, got {0}")]
    Length(usize),
    #[error("Address contains non-hex characters")]
    NotHex,
}

impl FromStr for Address {
    type Err = ParseAddressError;

    /// Parses 40 hex characters, with or without a 0x prefix. Case is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        if body.len() != 40 {
            return Err(ParseAddressError::Length(body.len()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| ParseAddressError::NotHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}
