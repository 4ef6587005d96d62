//! Search coordination: spawning workers, collecting matches, stopping.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};

use crate::crypto::{Address, KeypairSource, OsKeypairSource, PrivateKey};
use crate::error::{ConfigError, SearchError, SourceError};
use crate::matcher::PatternSpec;
use crate::stats::{Difficulty, StatsReporter};

use super::cpu::{SearchWorker, WorkerMessage, WorkerReport, WorkerStats};

/// A keypair that satisfied the pattern.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The private key
    pub private_key: PrivateKey,
    /// The matching address
    pub address: Address,
    /// Candidates the finding worker had drawn, this one included
    pub attempts: u64,
    /// Time since the finding worker started
    pub elapsed: Duration,
    /// The ID of the worker that found this result
    pub worker_id: usize,
}

impl MatchResult {
    /// The address, EIP-55 checksummed with 0x prefix.
    pub fn address_checksum(&self) -> String {
        self.address.to_checksum()
    }

    /// The private key as 64 hex characters, without 0x prefix.
    pub fn private_key_hex(&self) -> String {
        self.private_key.to_hex()
    }
}

/// What a finished search produced.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Accepted matches in channel arrival order, at most the target count
    pub matches: Vec<MatchResult>,
    /// Set when the search stopped before reaching the target count
    pub cancelled: bool,
    /// Candidates drawn by all workers together
    pub total_attempts: u64,
    /// Wall-clock duration of the search
    pub elapsed: Duration,
}

impl SearchOutcome {
    /// Returns true if the target count was reached.
    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }

    /// Returns the average generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.total_attempts as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Builds the keypair source for one worker, given its ID.
pub type SourceFactory = Arc<dyn Fn(usize) -> Box<dyn KeypairSource> + Send + Sync>;

/// Runs one search: spawns the workers, collects matches, stops them.
///
/// A coordinator is used once; [`SearchCoordinator::search`] consumes it.
/// Grab [`SearchCoordinator::stop_flag`] first to cancel from elsewhere.
pub struct SearchCoordinator {
    worker_count: usize,
    target_count: usize,
    source_factory: SourceFactory,
    stop_flag: Arc<AtomicBool>,
    timeout: Option<Duration>,
    report_interval: Option<Duration>,
}

impl fmt::Debug for SearchCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCoordinator")
            .field("worker_count", &self.worker_count)
            .field("target_count", &self.target_count)
            .field("timeout", &self.timeout)
            .field("report_interval", &self.report_interval)
            .finish_non_exhaustive()
    }
}

impl SearchCoordinator {
    /// Creates a coordinator drawing keys from the OS CSPRNG.
    pub fn new(worker_count: usize, target_count: usize) -> Result<Self, ConfigError> {
        if worker_count < 1 {
            return Err(ConfigError::NoWorkers);
        }
        if target_count < 1 {
            return Err(ConfigError::NoTarget);
        }

        Ok(Self {
            worker_count,
            target_count,
            source_factory: Arc::new(|_: usize| -> Box<dyn KeypairSource> {
                Box::new(OsKeypairSource::os())
            }),
            stop_flag: Arc::new(AtomicBool::new(false)),
            timeout: None,
            report_interval: None,
        })
    }

    /// Replaces the keypair source used by every worker.
    pub fn with_source_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize) -> Box<dyn KeypairSource> + Send + Sync + 'static,
    {
        self.source_factory = Arc::new(factory);
        self
    }

    /// Stops the search once `timeout` has elapsed, like a cancellation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Logs progress every `interval` while the search runs.
    pub fn with_progress(mut self, interval: Duration) -> Self {
        self.report_interval = Some(interval);
        self
    }

    /// Returns a clone of the stop flag for external use (e.g., signal handlers).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Returns the number of workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns the number of matches the search stops at.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Runs the search to completion.
    pub fn search(self, spec: &PatternSpec) -> Result<SearchOutcome, SearchError> {
        self.search_with(spec, |_| {})
    }

    /// Runs the search, passing each accepted match to `on_match` as it arrives.
    ///
    /// Returns exactly the target count of matches unless the stop flag was
    /// raised from outside or the timeout expired, in which case the outcome
    /// is marked cancelled. A failing keypair source stops every worker and
    /// is returned as an error.
    pub fn search_with<F>(
        self,
        spec: &PatternSpec,
        mut on_match: F,
    ) -> Result<SearchOutcome, SearchError>
    where
        F: FnMut(&MatchResult),
    {
        let pattern = Arc::new(spec.validate()?);
        let difficulty = Difficulty::of(&pattern);
        log::info!(
            "Searching for {} with {} workers, target {} ({}, ~{:.0} attempts per match)",
            pattern,
            self.worker_count,
            self.target_count,
            difficulty.description(),
            difficulty.expected_attempts()
        );

        let start = Instant::now();
        let (result_tx, result_rx) = unbounded();
        let stats: Vec<Arc<WorkerStats>> = (0..self.worker_count)
            .map(|_| Arc::new(WorkerStats::new()))
            .collect();

        let mut handles = Vec::with_capacity(self.worker_count);
        for (id, worker_stats) in stats.iter().enumerate() {
            let worker = SearchWorker::new(
                id,
                pattern.clone(),
                (self.source_factory)(id),
                result_tx.clone(),
                self.stop_flag.clone(),
                worker_stats.clone(),
            );

            let spawned = thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.stop_flag.store(true, Ordering::Release);
                    let _ = join_workers(handles);
                    return Err(SearchError::Spawn(e));
                }
            }
        }
        // Drop our sender so the channel closes once every worker has exited
        drop(result_tx);

        let reporter = match self.report_interval {
            Some(interval) => {
                let reporter = StatsReporter::new(stats.clone(), difficulty);
                match reporter.spawn(interval) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        log::warn!("Progress reporting disabled: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let collected = self.collect(&result_rx, start, &mut on_match);

        self.stop_flag.store(true, Ordering::Release);
        let joined = join_workers(handles);
        if let Some(reporter) = reporter {
            reporter.finish();
        }

        let matches = match collected {
            Ok(matches) => matches,
            Err((worker_id, source)) => return Err(SearchError::Source { worker_id, source }),
        };
        let reports = joined?;

        // Surplus matches still queued are discarded
        let surplus = result_rx.try_iter().count();
        if surplus > 0 {
            log::debug!("Discarded {} surplus message(s)", surplus);
        }

        let cancelled = matches.len() < self.target_count;
        if cancelled {
            log::warn!(
                "Search stopped early with {} of {} match(es)",
                matches.len(),
                self.target_count
            );
        }

        Ok(SearchOutcome {
            matches,
            cancelled,
            total_attempts: reports.iter().map(|r| r.attempts).sum(),
            elapsed: start.elapsed(),
        })
    }

    /// Drains the result channel until the target is reached, every worker
    /// has exited, or a worker reports a source failure.
    fn collect<F>(
        &self,
        result_rx: &Receiver<WorkerMessage>,
        start: Instant,
        on_match: &mut F,
    ) -> Result<Vec<MatchResult>, (usize, SourceError)>
    where
        F: FnMut(&MatchResult),
    {
        let mut matches = Vec::with_capacity(self.target_count);
        let mut deadline = self.timeout.map(|t| start + t);

        while matches.len() < self.target_count {
            let message = match deadline {
                Some(at) => result_rx.recv_deadline(at),
                None => result_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match message {
                Ok(WorkerMessage::Found(result)) => {
                    log::info!(
                        "Match #{}: {} (worker {}, {} attempts)",
                        matches.len() + 1,
                        result.address,
                        result.worker_id,
                        result.attempts
                    );
                    on_match(&result);
                    matches.push(result);
                }
                Ok(WorkerMessage::Failed { worker_id, error }) => {
                    return Err((worker_id, error));
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Timeout reached, stopping workers");
                    self.stop_flag.store(true, Ordering::Release);
                    deadline = None;
                }
                // Every worker exited: the flag was raised from outside or by a panic
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(matches)
    }
}

/// Waits for every worker thread, reporting the first panic.
fn join_workers(handles: Vec<JoinHandle<WorkerReport>>) -> Result<Vec<WorkerReport>, SearchError> {
    let mut reports = Vec::with_capacity(handles.len());
    let mut panicked = None;

    for (id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => {
                panicked.get_or_insert(id);
            }
        }
    }

    match panicked {
        Some(id) => Err(SearchError::WorkerPanicked(id)),
        None => Ok(reports),
    }
}

/// Searches with `worker_count` OS-seeded workers until `target_count`
/// matches are found.
pub fn search(
    spec: &PatternSpec,
    worker_count: usize,
    target_count: usize,
) -> Result<SearchOutcome, SearchError> {
    spec.validate()?;
    SearchCoordinator::new(worker_count, target_count)?.search(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use std::sync::atomic::AtomicU64;

    fn address(hex: &str) -> Address {
        hex.parse().unwrap()
    }

    fn keypair(addr: Address, tag: u8) -> Keypair {
        Keypair::from_parts(PrivateKey::from_bytes([tag; 32]), addr)
    }

    /// Cycles through a fixed list of addresses.
    struct Cycle {
        addresses: Vec<Address>,
        next: usize,
    }

    impl Cycle {
        fn boxed(addresses: Vec<Address>) -> Box<dyn KeypairSource> {
            Box::new(Self { addresses, next: 0 })
        }
    }

    impl KeypairSource for Cycle {
        fn next_keypair(&mut self) -> Result<Keypair, SourceError> {
            let addr = self.addresses[self.next % self.addresses.len()];
            self.next += 1;
            Ok(keypair(addr, self.next as u8))
        }
    }

    /// Yields a matching address every `period` draws.
    fn periodic(period: usize) -> Vec<Address> {
        let mut addresses = vec![address(&"1".repeat(40)); period - 1];
        addresses.push(address(&format!("dead{}", "0".repeat(36))));
        addresses
    }

    /// Never matches; counts every draw and raises `stop_flag` at `stop_at`.
    struct Counting {
        draws: Arc<AtomicU64>,
        stop_at: u64,
        stop_flag: Arc<AtomicBool>,
        raised_at: Arc<AtomicU64>,
    }

    impl KeypairSource for Counting {
        fn next_keypair(&mut self) -> Result<Keypair, SourceError> {
            let n = self.draws.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.stop_at {
                self.raised_at.store(n, Ordering::SeqCst);
                self.stop_flag.store(true, Ordering::SeqCst);
            }
            Ok(keypair(address(&"1".repeat(40)), 0))
        }
    }

    struct Failing;

    impl KeypairSource for Failing {
        fn next_keypair(&mut self) -> Result<Keypair, SourceError> {
            Err(SourceError::Entropy(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy unavailable",
            ))))
        }
    }

    struct Panicking;

    impl KeypairSource for Panicking {
        fn next_keypair(&mut self) -> Result<Keypair, SourceError> {
            panic!("keypair source blew up");
        }
    }

    fn dead_spec() -> PatternSpec {
        PatternSpec::new().with_prefix("dead")
    }

    #[test]
    fn test_returns_exactly_target_count() {
        for workers in [1, 2, 8] {
            for target in [1, 3] {
                let outcome = SearchCoordinator::new(workers, target)
                    .unwrap()
                    .with_source_factory(|_| Cycle::boxed(periodic(5)))
                    .search(&dead_spec())
                    .unwrap();

                assert_eq!(outcome.matches.len(), target, "W={} N={}", workers, target);
                assert!(outcome.is_complete());
                for m in &outcome.matches {
                    assert!(m.address.to_hex().starts_with("dead"));
                    assert_eq!(m.attempts % 5, 0);
                }
            }
        }
    }

    #[test]
    fn test_prefix_scenario_across_workers() {
        let sequence = vec![
            address(&"1".repeat(40)),
            address(&format!("deadbeef{}", "0".repeat(32))),
            address(&"2".repeat(40)),
        ];

        let outcome = SearchCoordinator::new(4, 1)
            .unwrap()
            .with_source_factory(move |_| Cycle::boxed(sequence.clone()))
            .search(&dead_spec())
            .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert!(outcome.matches[0].address.to_hex().starts_with("dead"));
        assert!(outcome.matches[0].private_key_hex().len() == 64);
    }

    #[test]
    fn test_letters_only_scenario() {
        let letters = address(&"abcdef".repeat(7)[..40]);
        let mixed = address(&format!("ab12{}", &"abcdef".repeat(7)[4..40]));

        let outcome = SearchCoordinator::new(1, 1)
            .unwrap()
            .with_source_factory(move |_| Cycle::boxed(vec![letters, mixed]))
            .search(&PatternSpec::new().letters_only())
            .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].address, letters);
        assert_eq!(outcome.matches[0].attempts, 1);

        // Mixed candidates alone never satisfy the pattern
        let pattern = PatternSpec::new().letters_only().validate().unwrap();
        assert!(!pattern.matches(&mixed));
    }

    #[test]
    fn test_invalid_spec_fails_before_spawning() {
        let built = Arc::new(AtomicU64::new(0));
        let counter = built.clone();

        let err = SearchCoordinator::new(4, 1)
            .unwrap()
            .with_source_factory(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Cycle::boxed(periodic(1))
            })
            .search(&PatternSpec::new().with_prefix("xyz"))
            .unwrap_err();

        assert!(matches!(
            err,
            SearchError::Config(ConfigError::InvalidCharacter { .. })
        ));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejects_zero_workers_or_target() {
        assert_eq!(SearchCoordinator::new(0, 1).unwrap_err(), ConfigError::NoWorkers);
        assert_eq!(SearchCoordinator::new(1, 0).unwrap_err(), ConfigError::NoTarget);
        assert!(matches!(
            search(&dead_spec(), 0, 1),
            Err(SearchError::Config(ConfigError::NoWorkers))
        ));
    }

    #[test]
    fn test_cancellation_stops_workers_within_one_iteration() {
        const WORKERS: u64 = 4;
        const STOP_AT: u64 = 200;

        let coordinator = SearchCoordinator::new(WORKERS as usize, 3).unwrap();
        let stop_flag = coordinator.stop_flag();
        let draws = Arc::new(AtomicU64::new(0));
        let raised_at = Arc::new(AtomicU64::new(0));

        let factory_draws = draws.clone();
        let factory_raised = raised_at.clone();
        let outcome = coordinator
            .with_source_factory(move |_| {
                Box::new(Counting {
                    draws: factory_draws.clone(),
                    stop_at: STOP_AT,
                    stop_flag: stop_flag.clone(),
                    raised_at: factory_raised.clone(),
                }) as Box<dyn KeypairSource>
            })
            .search(&dead_spec())
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.matches.len() < 3);
        assert_eq!(raised_at.load(Ordering::SeqCst), STOP_AT);
        // Each other worker may finish the draw it had already started
        assert!(draws.load(Ordering::SeqCst) <= STOP_AT + WORKERS - 1);
        assert_eq!(outcome.total_attempts, draws.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pre_raised_flag_returns_empty_cancelled() {
        let coordinator = SearchCoordinator::new(2, 1).unwrap();
        coordinator.stop_flag().store(true, Ordering::Release);

        let outcome = coordinator
            .with_source_factory(|_| Cycle::boxed(periodic(1)))
            .search(&dead_spec())
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.total_attempts, 0);
    }

    #[test]
    fn test_timeout_behaves_like_cancellation() {
        let outcome = SearchCoordinator::new(2, 1)
            .unwrap()
            .with_timeout(Duration::from_millis(50))
            .with_source_factory(|_| Cycle::boxed(vec![address(&"1".repeat(40))]))
            .search(&dead_spec())
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.matches.is_empty());
        assert!(outcome.total_attempts > 0);
    }

    #[test]
    fn test_source_failure_stops_search() {
        let err = SearchCoordinator::new(4, 1)
            .unwrap()
            .with_source_factory(|id| {
                if id == 2 {
                    Box::new(Failing) as Box<dyn KeypairSource>
                } else {
                    Cycle::boxed(vec![address(&"1".repeat(40))])
                }
            })
            .search(&dead_spec())
            .unwrap_err();

        assert!(matches!(
            err,
            SearchError::Source {
                worker_id: 2,
                source: SourceError::Entropy(_)
            }
        ));
    }

    #[test]
    fn test_on_match_sees_accepted_matches_in_order() {
        let mut seen = Vec::new();
        let outcome = SearchCoordinator::new(3, 3)
            .unwrap()
            .with_source_factory(|_| Cycle::boxed(periodic(2)))
            .search_with(&dead_spec(), |m| seen.push(m.address))
            .unwrap();

        let returned: Vec<Address> = outcome.matches.iter().map(|m| m.address).collect();
        assert_eq!(seen, returned);
    }

    #[test]
    fn test_real_keys_with_one_char_prefix() {
        let outcome = search(&PatternSpec::new().with_prefix("a"), 2, 2).unwrap();
        assert_eq!(outcome.matches.len(), 2);

        for m in &outcome.matches {
            let rederived = Keypair::from_secret_key(*m.private_key.as_bytes()).unwrap();
            assert_eq!(rederived.address(), &m.address);
            assert!(m.address.to_hex().starts_with('a'));
        }
    }

    #[test]
    fn test_worker_panic_stops_other_workers() {
        let err = SearchCoordinator::new(3, 1)
            .unwrap()
            .with_source_factory(|id| {
                if id == 1 {
                    Box::new(Panicking) as Box<dyn KeypairSource>
                } else {
                    Cycle::boxed(vec![address(&"1".repeat(40))])
                }
            })
            .search(&dead_spec())
            .unwrap_err();

        assert!(matches!(err, SearchError::WorkerPanicked(1)));
    }
}
