//! CPU-based search worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::crypto::KeypairSource;
use crate::error::SourceError;
use crate::matcher::Pattern;

use super::MatchResult;

/// Counters for a single worker.
///
/// Only the owning worker writes; anyone may read a snapshot.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Candidates drawn so far
    attempts: AtomicU64,
    /// Matches found so far
    matches: AtomicU64,
}

impl WorkerStats {
    /// Creates new worker stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidates drawn so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Returns the matches found so far.
    pub fn matches(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn set_attempts(&self, attempts: u64) {
        self.attempts.store(attempts, Ordering::Relaxed);
    }
}

/// Message from a worker to the coordinator.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A candidate satisfied the pattern
    Found(MatchResult),
    /// The keypair source failed; the worker has exited
    Failed { worker_id: usize, error: SourceError },
}

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    /// Just matched; goes back to `Running` once the result is handed off
    Found,
    Stopped,
    Failed,
}

/// Summary a worker returns when its thread ends.
#[derive(Debug, Clone, Copy)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub state: WorkerState,
    pub attempts: u64,
    pub matches: u64,
}

/// Raises the stop flag if the worker thread unwinds.
struct StopOnPanic(Arc<AtomicBool>);

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

/// A worker that draws candidates and tests them against the pattern.
pub struct SearchWorker {
    /// Worker ID
    id: usize,
    /// The pattern to match against
    pattern: Arc<Pattern>,
    /// Where candidates come from
    source: Box<dyn KeypairSource>,
    /// Channel to send results
    result_tx: Sender<WorkerMessage>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Worker statistics
    stats: Arc<WorkerStats>,
    state: WorkerState,
}

impl SearchWorker {
    /// Creates a new worker.
    pub fn new(
        id: usize,
        pattern: Arc<Pattern>,
        source: Box<dyn KeypairSource>,
        result_tx: Sender<WorkerMessage>,
        stop_flag: Arc<AtomicBool>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        Self {
            id,
            pattern,
            source,
            result_tx,
            stop_flag,
            stats,
            state: WorkerState::Idle,
        }
    }

    /// Runs the worker loop.
    ///
    /// Draws keypairs and tests them against the pattern until:
    /// - Stop flag is set (checked before every draw)
    /// - The source fails (reported through the channel)
    /// - Channel is closed
    ///
    /// A panic in the source or matcher raises the stop flag on the way out.
    /// Non-matching keypairs are dropped where they were drawn.
    pub fn run(mut self) -> WorkerReport {
        let start = Instant::now();
        let mut attempts = 0u64;
        let mut matches = 0u64;
        let _guard = StopOnPanic(self.stop_flag.clone());
        self.state = WorkerState::Running;

        while !self.stop_flag.load(Ordering::Acquire) {
            let keypair = match self.source.next_keypair() {
                Ok(keypair) => keypair,
                Err(error) => {
                    log::error!("Worker {} keypair source failed: {}", self.id, error);
                    self.state = WorkerState::Failed;
                    let _ = self.result_tx.send(WorkerMessage::Failed {
                        worker_id: self.id,
                        error,
                    });
                    break;
                }
            };

            attempts += 1;
            self.stats.attempts.store(attempts, Ordering::Relaxed);

            if !self.pattern.matches(keypair.address()) {
                continue;
            }

            self.state = WorkerState::Found;
            matches += 1;
            self.stats.matches.store(matches, Ordering::Relaxed);

            let (private_key, address) = keypair.into_parts();
            let result = MatchResult {
                private_key,
                address,
                attempts,
                elapsed: start.elapsed(),
                worker_id: self.id,
            };

            if self.result_tx.send(WorkerMessage::Found(result)).is_err() {
                // Coordinator is gone, nobody wants more results
                break;
            }
            self.state = WorkerState::Running;
        }

        if self.state != WorkerState::Failed {
            self.state = WorkerState::Stopped;
        }
        log::debug!(
            "Worker {} exited after {} attempts ({:?})",
            self.id,
            attempts,
            self.state
        );

        WorkerReport {
            worker_id: self.id,
            state: self.state,
            attempts,
            matches,
        }
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }
}
