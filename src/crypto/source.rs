//! Candidate keypair sources.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secp256k1::{Secp256k1, SecretKey, SignOnly};

use super::Keypair;
use crate::error::SourceError;

/// Produces one fresh candidate keypair per call.
///
/// Every worker owns its own source, so implementations need no
/// internal synchronization.
pub trait KeypairSource: Send {
    /// Draws the next candidate.
    fn next_keypair(&mut self) -> Result<Keypair, SourceError>;
}

/// Draws every private key independently from an injected CSPRNG.
///
/// Each call consumes a full 32 bytes from the RNG; there is no counter
/// or derived sequence between candidates.
pub struct RngSource<R> {
    secp: Secp256k1<SignOnly>,
    rng: R,
}

/// The production source, backed by the operating system's CSPRNG.
pub type OsKeypairSource = RngSource<OsRng>;

impl<R: RngCore + CryptoRng> RngSource<R> {
    /// Creates a source drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self {
            secp: Secp256k1::signing_only(),
            rng,
        }
    }
}

impl OsKeypairSource {
    /// Creates a source drawing from the OS entropy source.
    pub fn os() -> Self {
        Self::new(OsRng)
    }
}

impl<R: RngCore + CryptoRng + Send> KeypairSource for RngSource<R> {
    fn next_keypair(&mut self) -> Result<Keypair, SourceError> {
        loop {
            let mut secret = [0u8; 32];
            self.rng.try_fill_bytes(&mut secret)?;

            // Zero or >= curve order; probability ~2^-128, draw again
            if let Ok(secret_key) = SecretKey::from_slice(&secret) {
                return Ok(Keypair::derive(&self.secp, &secret_key));
            }
        }
    }
}
