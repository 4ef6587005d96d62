//! Cryptographic operations for Ethereum key and address generation.
//!
//! This module provides:
//! - Ethereum address derivation using Keccak-256, with EIP-55 rendering
//! - Keypair and private key types
//! - Candidate sources backed by an injectable CSPRNG

mod address;
mod keypair;
mod source;

pub use address::{Address, ParseAddressError};
pub use keypair::{Keypair, PrivateKey};
pub use source::{KeypairSource, OsKeypairSource, RngSource};
