//! Throughput, match probability and ETA reporting.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::matcher::{pinned_positions, CharClass, Pattern, ADDRESS_HEX_LEN};
use crate::worker::WorkerStats;

/// Match probability of a pattern, per candidate.
///
/// Treats every constraint as independent, which is exact for
/// prefix/suffix/character classes and an approximation once
/// `contains` or mirror overlap with the others.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    probability: f64,
}

impl Difficulty {
    /// Estimates the probability that one random address matches `pattern`.
    ///
    /// A hex character matches with probability 1/16. Under case-sensitive
    /// matching a letter must also carry the right checksum case, 1/32.
    pub fn of(pattern: &Pattern) -> Self {
        let spec = pattern.spec();
        let case_sensitive = spec.case_sensitive;
        let class = spec.char_class();
        let pinned = pinned_positions(spec.prefix.as_deref(), spec.suffix.as_deref());

        let char_p = |c: u8| {
            if case_sensitive && c.is_ascii_alphabetic() {
                1.0 / 32.0
            } else {
                1.0 / 16.0
            }
        };
        // Chance that an unconstrained position falls in the class
        let free_p = class.map_or(1.0, |class| f64::from(class.size()) / 16.0);

        let mut probability: f64 = pinned.iter().flatten().map(|&c| char_p(c)).product();

        if spec.mirror {
            for i in 0..ADDRESS_HEX_LEN / 2 {
                probability *= match (pinned[i], pinned[ADDRESS_HEX_LEN - 1 - i]) {
                    (Some(_), Some(_)) => 1.0,
                    (Some(c), None) | (None, Some(c)) => char_p(c),
                    (None, None) => mirror_pair_p(class, case_sensitive),
                };
            }
        } else {
            let free = pinned.iter().filter(|c| c.is_none()).count();
            probability *= free_p.powi(free as i32);
        }

        if let Some(contains) = &spec.contains {
            let windows = (ADDRESS_HEX_LEN - contains.len() + 1) as f64;
            let hit: f64 = contains.bytes().map(char_p).product();
            probability *= (windows * hit).min(1.0);
        }

        Self { probability }
    }

    /// Probability of a match per attempt.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Expected number of attempts until the first match.
    pub fn expected_attempts(&self) -> f64 {
        if self.probability > 0.0 {
            1.0 / self.probability
        } else {
            f64::INFINITY
        }
    }

    /// Expected time until the next match at `throughput` attempts/second.
    pub fn eta(&self, throughput: f64) -> Option<Duration> {
        let rate = throughput * self.probability;
        if rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate).ok()
        } else {
            None
        }
    }

    /// Returns a human-readable difficulty estimate.
    pub fn description(&self) -> &'static str {
        let attempts = self.expected_attempts();
        if attempts <= 1e3 {
            "Very Easy (< 1 second)"
        } else if attempts <= 1e5 {
            "Easy (seconds)"
        } else if attempts <= 1e7 {
            "Medium (minutes)"
        } else if attempts <= 1e9 {
            "Hard (hours)"
        } else {
            "Very Hard (days or more)"
        }
    }
}

/// Probability that two free mirrored positions agree.
fn mirror_pair_p(class: Option<CharClass>, case_sensitive: bool) -> f64 {
    // Equal letters must also get the same checksum case
    let letter_weight = if case_sensitive { 0.5 } else { 1.0 };
    let equal_values = match class {
        Some(CharClass::Letters) => 6.0 * letter_weight,
        Some(CharClass::Numbers) => 10.0,
        None => 10.0 + 6.0 * letter_weight,
    };
    equal_values / 256.0
}

/// A point-in-time view of search progress.
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    /// Sum of all workers' attempts
    pub total_attempts: u64,
    /// Time since the reporter started
    pub elapsed: Duration,
    /// Attempts per second since the previous snapshot
    pub throughput: f64,
    /// Expected time until the next match at the current throughput
    pub eta: Option<Duration>,
}

/// Aggregates per-worker counters into throughput and ETA figures.
///
/// Each counter is read independently without a global lock, so a
/// snapshot may lag slightly behind but never goes backwards.
pub struct StatsReporter {
    counters: Vec<Arc<WorkerStats>>,
    difficulty: Difficulty,
    start: Instant,
    last_sample: Instant,
    last_total: u64,
}

impl StatsReporter {
    pub fn new(counters: Vec<Arc<WorkerStats>>, difficulty: Difficulty) -> Self {
        let now = Instant::now();
        Self {
            counters,
            difficulty,
            start: now,
            last_sample: now,
            last_total: 0,
        }
    }

    /// Returns the pattern difficulty used for ETA estimates.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Returns the sum of all workers' attempt counters.
    pub fn total_attempts(&self) -> u64 {
        self.counters.iter().map(|c| c.attempts()).sum()
    }

    /// Takes a snapshot; throughput is measured since the previous call.
    pub fn sample(&mut self) -> StatsSnapshot {
        let now = Instant::now();
        let total = self.total_attempts().max(self.last_total);
        let window = now.duration_since(self.last_sample).as_secs_f64();

        let throughput = if window > 0.0 {
            (total - self.last_total) as f64 / window
        } else {
            0.0
        };

        self.last_sample = now;
        self.last_total = total;

        StatsSnapshot {
            total_attempts: total,
            elapsed: now.duration_since(self.start),
            throughput,
            eta: self.difficulty.eta(throughput),
        }
    }

    /// Logs a snapshot every `interval` on a background thread.
    ///
    /// The thread ends as soon as the returned handle is finished.
    pub fn spawn(mut self, interval: Duration) -> io::Result<ReporterHandle> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("vanity-stats".into())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let snapshot = self.sample();
                        log::info!("{}", format_snapshot(&snapshot));
                    }
                    _ => break,
                }
            })?;

        Ok(ReporterHandle {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}

/// Handle to a running reporter thread.
pub struct ReporterHandle {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReporterHandle {
    /// Stops the reporter and waits for its thread.
    pub fn finish(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        // Dropping the sender wakes the reporter immediately
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Renders a snapshot as a single progress line.
pub fn format_snapshot(snapshot: &StatsSnapshot) -> String {
    let eta = snapshot
        .eta
        .map_or_else(|| "unknown".to_string(), format_duration);
    format!(
        "[{:>4}s] Generated {} keys ({}/s), next match in ~{}",
        snapshot.elapsed.as_secs(),
        format_number(snapshot.total_attempts),
        format_number(snapshot.throughput as u64),
        eta
    )
}

/// Formats a count with K/M/B suffixes.
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Formats a duration coarsely: seconds, minutes, hours, days or years.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3_600.0 {
        format!("{:.1}m", secs / 60.0)
    } else if secs < 86_400.0 {
        format!("{:.1}h", secs / 3_600.0)
    } else if secs < 31_536_000.0 {
        format!("{:.1}d", secs / 86_400.0)
    } else {
        format!("{:.1}y", secs / 31_536_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::PatternSpec;

    fn difficulty(spec: PatternSpec) -> Difficulty {
        Difficulty::of(&spec.validate().unwrap())
    }

    fn close(a: f64, b: f64) -> bool {
        ((a - b) / b).abs() < 1e-9
    }

    #[test]
    fn test_prefix_difficulty() {
        let d = difficulty(PatternSpec::new().with_prefix("dead"));
        assert!(close(d.expected_attempts(), 65536.0)); // 16^4
        assert_eq!(d.description(), "Easy (seconds)");
    }

    #[test]
    fn test_case_sensitive_letters_are_harder() {
        let insensitive = difficulty(PatternSpec::new().with_prefix("dead"));
        let sensitive = difficulty(PatternSpec::new().with_prefix("DEAD").case_sensitive(true));
        assert!(close(sensitive.expected_attempts(), 32f64.powi(4)));
        assert!(sensitive.probability() < insensitive.probability());

        // Digits carry no case
        let digits = difficulty(PatternSpec::new().with_prefix("1234").case_sensitive(true));
        assert!(close(digits.expected_attempts(), 65536.0));
    }

    #[test]
    fn test_char_class_difficulty() {
        let letters = difficulty(PatternSpec::new().letters_only());
        assert!(close(letters.probability(), (6.0f64 / 16.0).powi(40)));

        let numbers = difficulty(PatternSpec::new().numbers_only().with_prefix("12"));
        let expected = (1.0f64 / 16.0).powi(2) * (10.0f64 / 16.0).powi(38);
        assert!(close(numbers.probability(), expected));
    }

    #[test]
    fn test_mirror_difficulty() {
        let mirror = difficulty(PatternSpec::new().mirror());
        assert!(close(mirror.probability(), (1.0f64 / 16.0).powi(20)));

        // Prefix pins one side of two pairs; the partners cost 1/16 each
        let pinned = difficulty(PatternSpec::new().mirror().with_prefix("ab"));
        assert!(close(pinned.probability(), (1.0f64 / 16.0).powi(22)));
    }

    #[test]
    fn test_contains_difficulty() {
        let d = difficulty(PatternSpec::new().with_contains("cafe"));
        assert!(close(d.probability(), 37.0 / 65536.0));
    }

    #[test]
    fn test_eta() {
        let d = difficulty(PatternSpec::new().with_prefix("dead"));
        assert_eq!(d.eta(65536.0), Some(Duration::from_secs(1)));
        assert_eq!(d.eta(0.0), None);
    }

    #[test]
    fn test_sample_uses_deltas() {
        let counters_a = Arc::new(WorkerStats::new());
        let counters_b = Arc::new(WorkerStats::new());
        let d = difficulty(PatternSpec::new().with_prefix("a"));
        let mut reporter = StatsReporter::new(vec![counters_a.clone(), counters_b.clone()], d);

        let first = reporter.sample();
        assert_eq!(first.total_attempts, 0);
        assert_eq!(first.throughput, 0.0);
        assert_eq!(first.eta, None);

        counters_a.set_attempts(600);
        counters_b.set_attempts(400);
        thread::sleep(Duration::from_millis(20));
        let second = reporter.sample();
        assert_eq!(second.total_attempts, 1000);
        assert!(second.throughput > 0.0);
        // 1000 attempts over at least 20ms
        assert!(second.throughput <= 1000.0 / 0.02);
        assert!(second.eta.is_some());

        counters_a.set_attempts(700);
        thread::sleep(Duration::from_millis(20));
        let third = reporter.sample();
        assert_eq!(third.total_attempts, 1100);
        // Only the 100 new attempts count towards this window
        assert!(third.throughput <= 100.0 / 0.02);
        assert!(third.elapsed >= second.elapsed);
    }

    #[test]
    fn test_sample_never_goes_backwards() {
        let counter = Arc::new(WorkerStats::new());
        let d = difficulty(PatternSpec::new().with_prefix("a"));
        let mut reporter = StatsReporter::new(vec![counter.clone()], d);

        counter.set_attempts(500);
        assert_eq!(reporter.sample().total_attempts, 500);

        // A stale, smaller read must not lower the total
        counter.set_attempts(200);
        let snapshot = reporter.sample();
        assert_eq!(snapshot.total_attempts, 500);
        assert_eq!(snapshot.throughput, 0.0);

        counter.set_attempts(800);
        assert_eq!(reporter.sample().total_attempts, 800);
    }

    #[test]
    fn test_reporter_thread_stops_promptly() {
        let d = difficulty(PatternSpec::new().with_prefix("a"));
        let reporter = StatsReporter::new(vec![Arc::new(WorkerStats::new())], d);
        let handle = reporter.spawn(Duration::from_secs(3600)).unwrap();

        let start = Instant::now();
        handle.finish();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.50K");
        assert_eq!(format_number(2_000_000), "2.00M");
        assert_eq!(format_number(3_100_000_000), "3.10B");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2.0h");
        assert_eq!(format_duration(Duration::from_secs(172_800)), "2.0d");
    }
}
