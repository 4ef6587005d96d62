//! Runtime configuration for the vanity address search.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::matcher::PatternSpec;

/// Offline Ethereum vanity address search
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address must start with this (hex characters only: 0-9, a-f)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Address must end with this
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Address must contain this anywhere
    #[arg(long)]
    pub contains: Option<String>,

    /// Address must consist of letters (a-f) only
    #[arg(long, conflicts_with = "numbers")]
    pub letters: bool,

    /// Address must consist of digits (0-9) only
    #[arg(long)]
    pub numbers: bool,

    /// Address must read the same forwards and backwards
    #[arg(long)]
    pub mirror: bool,

    /// Match against the EIP-55 checksum casing
    #[arg(short = 'c', long)]
    pub case_sensitive: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Stop after finding N addresses
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Only print matches, no banner or progress
    #[arg(short, long)]
    pub quiet: bool,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also write matches to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }

    /// Builds the pattern spec. Validation happens when it is compiled.
    pub fn pattern_spec(&self) -> PatternSpec {
        PatternSpec {
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            contains: self.contains.clone(),
            letters_only: self.letters,
            numbers_only: self.numbers,
            mirror: self.mirror,
            case_sensitive: self.case_sensitive,
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Progress interval, or `None` when quiet or disabled with 0.
    pub fn progress_interval(&self) -> Option<Duration> {
        if self.quiet || self.report_interval == 0 {
            None
        } else {
            Some(Duration::from_secs(self.report_interval))
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
