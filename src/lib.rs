//! # eth_vanity_search
//!
//! Offline Ethereum vanity address search.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation, address derivation and candidate sources
//! - `matcher`: Pattern configuration and matching
//! - `worker`: Search workers and the coordinator that stops them
//! - `stats`: Throughput, probability and ETA reporting
//! - `output`: JSON persistence of matches
//! - `config`: Command line configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod matcher;
pub mod output;
pub mod stats;
pub mod worker;

pub use config::Config;
pub use crypto::{Address, Keypair, KeypairSource, OsKeypairSource, PrivateKey, RngSource};
pub use error::{ConfigError, SearchError, SourceError};
pub use matcher::{CharClass, Constraint, Pattern, PatternSpec};
pub use stats::{Difficulty, StatsReporter, StatsSnapshot};
pub use worker::{search, MatchResult, SearchCoordinator, SearchOutcome};
