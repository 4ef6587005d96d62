//! Ethereum keypair generation.

use std::fmt;

use secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};

use super::address::keccak256;
use super::Address;
use crate::error::SourceError;

/// A 32-byte secp256k1 secret key.
///
/// `Debug` never prints the key material. The only renderings are
/// [`PrivateKey::to_hex`] and [`PrivateKey::to_hex_prefixed`].
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Wraps raw key bytes. Range checking happens in [`Keypair::from_secret_key`].
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the private key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the private key as 64 hex characters, without a 0x prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the private key as `0x` followed by 64 hex characters.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{}", self.to_hex())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A candidate keypair: private key plus derived address.
#[derive(Debug, Clone)]
pub struct Keypair {
    private_key: PrivateKey,
    address: Address,
}

impl Keypair {
    /// Pairs a private key with an address without deriving one from the other.
    ///
    /// Intended for custom [`KeypairSource`](super::KeypairSource)
    /// implementations; nothing checks that the two belong together.
    pub fn from_parts(private_key: PrivateKey, address: Address) -> Self {
        Self {
            private_key,
            address,
        }
    }

    /// Builds a keypair from an existing secret key.
    ///
    /// Fails for zero and for values not below the curve order.
    pub fn from_secret_key(secret_bytes: [u8; 32]) -> Result<Self, SourceError> {
        let secp = Secp256k1::signing_only();
        let secret_key = SecretKey::from_slice(&secret_bytes)?;
        Ok(Self::derive(&secp, &secret_key))
    }

    /// Derives the address for `secret_key` using an existing context.
    pub(crate) fn derive<C: Signing>(secp: &Secp256k1<C>, secret_key: &SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(secp, secret_key);

        Self {
            private_key: PrivateKey(secret_key.secret_bytes()),
            address: derive_address(&public_key),
        }
    }

    /// Returns the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Returns a reference to the derived address.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Splits the keypair into its parts.
    pub fn into_parts(self) -> (PrivateKey, Address) {
        (self.private_key, self.address)
    }
}

/// Derives an Ethereum address from a secp256k1 public key.
///
/// Process:
/// 1. Serialize the public key in uncompressed form (65 bytes)
/// 2. Remove the first byte (0x04 prefix)
/// 3. Hash the remaining 64 bytes with Keccak-256
/// 4. Take the last 20 bytes of the hash
#[inline]
fn derive_address(public_key: &PublicKey) -> Address {
    let public_key_bytes = public_key.serialize_uncompressed();
    let hash = keccak256(&public_key_bytes[1..]);

    let mut address_bytes = [0u8; 20];
    address_bytes.copy_from_slice(&hash[12..]);

    Address::from_bytes(address_bytes)
}
