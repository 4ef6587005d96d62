//! Ethereum Vanity Address Search CLI
//!
//! Usage:
//!   eth-vanity-search -p dead               # Address starting with "dead"
//!   eth-vanity-search -s beef -c            # Ending with "beef", checksum casing
//!   eth-vanity-search --letters -n 3        # 3 addresses without any digit
//!   eth-vanity-search --mirror -o out.json  # A palindrome address, saved to JSON

use std::error::Error;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use eth_vanity_search::output::{self, MatchRecord};
use eth_vanity_search::stats::format_number;
use eth_vanity_search::{Config, Difficulty, MatchResult, SearchCoordinator};

fn main() {
    let config = Config::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter()),
    )
    .init();

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let spec = config.pattern_spec();
    let pattern = spec.validate()?;

    let mut coordinator = SearchCoordinator::new(config.worker_count(), config.count)?;
    if let Some(timeout) = config.timeout() {
        coordinator = coordinator.with_timeout(timeout);
    }
    if let Some(interval) = config.progress_interval() {
        coordinator = coordinator.with_progress(interval);
    }

    if !config.quiet {
        let difficulty = Difficulty::of(&pattern);
        println!("Ethereum Vanity Address Search");
        println!("==============================");
        println!("Pattern:    {}", pattern);
        println!(
            "Difficulty: {} (~{} attempts per match)",
            difficulty.description(),
            format_number(difficulty.expected_attempts().min(u64::MAX as f64) as u64)
        );
        println!("Workers:    {}", coordinator.worker_count());
        println!("Target:     {} address(es)", coordinator.target_count());
        println!();
        println!("Searching... (Press Ctrl+C to stop)\n");
    }

    ctrlc_handler(coordinator.stop_flag());

    let mut found = 0;
    let outcome = coordinator.search_with(&spec, |result| {
        found += 1;
        print_result(result, found);
    })?;

    if outcome.cancelled {
        println!(
            "\nStopped early. Found {} of {} address(es).",
            outcome.matches.len(),
            config.count
        );
    } else if !config.quiet {
        println!("\nTarget reached! Found {} address(es).", outcome.matches.len());
    }

    if let Some(path) = &config.output {
        let records: Vec<MatchRecord> = outcome.matches.iter().map(MatchRecord::from).collect();
        output::write_json(path, &records)?;
        log::info!("Wrote {} match(es) to {}", records.len(), path.display());
    }

    if !config.quiet {
        println!("\n--- Final Statistics ---");
        println!("Total keys generated: {}", format_number(outcome.total_attempts));
        println!("Total matches found:  {}", outcome.matches.len());
        println!("Time elapsed:         {:.2}s", outcome.elapsed.as_secs_f64());
        println!(
            "Average speed:        {}/s",
            format_number(outcome.keys_per_second() as u64)
        );
    }

    Ok(())
}

fn print_result(result: &MatchResult, index: usize) {
    println!("=== Match #{} ===", index);
    println!("Address:     {}", result.address_checksum());
    println!("Private Key: {}", result.private_key.to_hex_prefixed());
    println!("Worker:      {}", result.worker_id);
    println!("Attempts:    {}", format_number(result.attempts));
    println!();
}

fn ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Release);
    }) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }
}
