//! Parallel vanity address search.
//!
//! This module provides:
//! - CPU search workers, one OS thread each
//! - The coordinator that collects matches and stops the workers
//! - Per-worker counters for progress reporting

mod cpu;
mod pool;

pub use cpu::{SearchWorker, WorkerMessage, WorkerReport, WorkerState, WorkerStats};
pub use pool::{search, MatchResult, SearchCoordinator, SearchOutcome, SourceFactory};
