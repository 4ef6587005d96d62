//! Error types shared across the search engine.

use std::io;

/// An ill-formed search configuration, detected before any worker starts.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No constraint given: set at least one of prefix, suffix, contains, letters, numbers or mirror")]
    NoConstraint,

    #[error("{field} cannot be empty")]
    EmptyPattern { field: &'static str },

    #[error("{field} must contain only hex characters ({allowed}), got {value:?}")]
    InvalidCharacter {
        field: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("{field} cannot be longer than 40 characters (full address)")]
    TooLong { field: &'static str },

    #[error("Combined prefix + suffix cannot be longer than 40 characters")]
    PrefixSuffixTooLong,

    #[error("Letters-only and numbers-only are mutually exclusive")]
    ConflictingCharClass,

    #[error("{field} {value:?} can never appear in a {class} address")]
    ImpossibleForClass {
        field: &'static str,
        value: String,
        class: &'static str,
    },

    #[error("Prefix and suffix contradict the mirror constraint")]
    MirrorConflict,

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Target count must be at least 1")]
    NoTarget,
}

/// Failure of the keypair primitive or its random source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Entropy source unavailable: {0}")]
    Entropy(#[from] rand::Error),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(#[from] secp256k1::Error),
}

/// Anything that can end a search without a result sequence.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker {worker_id} failed: {source}")]
    Source {
        worker_id: usize,
        #[source]
        source: SourceError,
    },

    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),
}
