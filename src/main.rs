// src/main.rs
use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use powscan::*;
use std::time::{Duration, Instant};

/// Main entry point for powscan
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Mine(opts) => run_mine(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
        cli::Action::Algorithms => list_algorithms(),
    }
}

/// Scans a job file and prints verified shares
///
/// # Arguments
/// * `opts` - Command line options for the scan
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration and applies CLI overrides
/// 3. Builds the job for the selected algorithm
/// 4. Starts the scheduler and publishes the job
/// 5. Re-verifies each share and prints it as a JSON line until a stop condition
fn run_mine(opts: cli::MineOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load_or_default(&opts.config)?;
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        config.worker_threads = workers;
    }
    if let Some(algorithm) = opts.algorithm {
        config.algorithm = algorithm;
    }
    config.validate()?;

    let algorithm = registry::lookup(&config.algorithm)?;
    let job = JobFile::load(&opts.job)?.into_job(algorithm.descriptor())?;
    if let Some(height) = job.height() {
        log::info!("Job {} is for block height {}", job.job_id, height);
    }

    // Statistics reporting
    let reporter = StatsReporter::new(Duration::from_secs(config.report_interval_secs.max(1)));
    let verdicts = reporter.share_sender();
    reporter.start_reporting();

    // Scanning setup
    let (share_sender, share_receiver) = unbounded();
    let mut scheduler = Scheduler::new(share_sender, config.scan_chunk)
        .with_mask_table(config.mask_table()?)
        .with_params(config.params)
        .with_hash_sender(reporter.hash_sender());
    let ready = scheduler.start_mining(algorithm.clone(), config.worker_count())?;
    log::info!(
        "{} workers scanning with {}",
        ready,
        algorithm.descriptor().display_name
    );
    scheduler.update_job(job.clone());

    let deadline = opts.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut verified = 0u64;

    loop {
        match share_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(share) => {
                if share.job_id != job.job_id {
                    continue;
                }
                let verdict = if algorithm.verify(&job, share.nonce, &config.params)? {
                    print_share(&share)?;
                    verified += 1;
                    ShareResult::Verified
                } else {
                    log::warn!("Share {:08x} from worker {} failed re-verification", share.nonce, share.thr_id);
                    ShareResult::Rejected
                };
                verdicts
                    .send(verdict)
                    .map_err(|e| MinerError::ChannelError(format!("Verdict send failed: {}", e)))?;

                if opts.max_shares > 0 && verified >= opts.max_shares {
                    log::info!("Found {} share(s), stopping", verified);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                scheduler.check_workers()?;
                if share_receiver.is_empty() && scheduler.is_exhausted() {
                    log::info!("Nonce space exhausted after {} share(s)", verified);
                    break;
                }
                if share_receiver.is_empty() && scheduler.is_stalled() {
                    log::error!(
                        "{} worker(s) failed, their nonce slices were not scanned",
                        scheduler.failed_workers()
                    );
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::warn!("Timed out after {} share(s)", verified);
            break;
        }
    }

    scheduler.stop();
    reporter.stop_reporting();
    // the scheduler and verdict sender hold the last stats senders
    drop(scheduler);
    drop(verdicts);
    reporter.join_listeners();

    let stats = reporter.get_stats();
    log::info!(
        "Hashed {} candidates at {:.2} H/s, {} share(s) verified",
        stats.hashes_total,
        stats.avg_hashrate,
        stats.shares_verified
    );
    Ok(())
}

/// Prints a share as one JSON line on stdout
fn print_share(share: &Share) -> Result<(), MinerError> {
    let line = serde_json::json!({
        "job_id": share.job_id,
        "worker": share.thr_id,
        "nonce": format!("{:08x}", share.nonce),
        "hash": types::display_hash(&share.hash),
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

/// Runs algorithm benchmarks
///
/// # Arguments
/// * `opts` - Benchmark configuration options
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Loads cost parameters and the filter table from the config file
/// 3. Starts the scheduler on a job no digest can meet
/// 4. Lets the workers scan for the requested duration
/// 5. Collects and reports performance statistics
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    utils::init_bench_logging();

    let mut config = config::load_or_default(&opts.config)?;
    config.algorithm = opts.algorithm;
    config.validate()?;

    let algorithm = registry::lookup(&config.algorithm)?;
    let mut reporter = StatsReporter::new(Duration::from_secs(5));
    reporter.start_reporting();

    let (share_sender, _share_receiver) = unbounded();
    let mut scheduler = Scheduler::new(share_sender, 0x1000)
        .with_mask_table(config.mask_table()?)
        .with_params(config.params)
        .with_hash_sender(reporter.hash_sender());
    let ready = scheduler.start_mining(algorithm.clone(), opts.threads)?;

    log::info!(
        "Starting {} benchmark on {} threads for {} seconds",
        algorithm.descriptor().display_name,
        ready,
        opts.duration
    );
    log::logger().flush();

    let start_time = Instant::now();
    scheduler.update_job(Job::new("benchmark", [0; types::HEADER_WORDS], Target::ZERO));
    std::thread::sleep(Duration::from_secs(opts.duration));
    scheduler.check_workers()?;
    scheduler.stop();
    reporter.stop_reporting();
    let elapsed = start_time.elapsed().as_secs_f64();
    drop(scheduler);
    reporter.join_listeners();

    // Report final results
    let stats = reporter.get_stats();
    let hardware = reporter.get_hardware_stats();
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", stats.hashes_total);
    if elapsed > 0.0 {
        log::info!("Hashrate: {:.2} H/s", stats.hashes_total as f64 / elapsed);
    }
    log::info!(
        "CPU: {:.1}% | Memory: {} MiB | Temp: {:.1}°C",
        hardware.cpu_usage,
        hardware.memory_used / (1024 * 1024),
        hardware.temperature
    );
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    utils::init_logging();
    let template = config::generate_template(opts.filter);
    std::fs::write(&opts.output, template)?;
    log::info!("Wrote configuration template to {}", opts.output.display());
    Ok(())
}

/// Prints every registered algorithm
fn list_algorithms() -> Result<(), MinerError> {
    for algorithm in registry::list() {
        let descriptor = algorithm.descriptor();
        println!("{:<14} {}", descriptor.name, descriptor.display_name);
    }
    Ok(())
}
