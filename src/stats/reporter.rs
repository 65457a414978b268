// src/stats/reporter.rs
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Components, System};

/// Point-in-time view of the scan counters
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Candidates hashed and tested across all workers
    pub hashes_total: u64,
    /// Shares reported by the scanner, whatever their re-check result
    pub shares_found: u64,
    /// Shares that passed re-verification
    pub shares_verified: u64,
    /// Shares that failed re-verification
    pub shares_rejected: u64,
    /// Hashes per second since the reporter was created
    pub avg_hashrate: f64,
    /// Hashes per second over the last reporting window
    pub recent_hashrate: f64,
}

/// Host load sampled through `sysinfo`
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Mean usage over all cores, in percent
    pub cpu_usage: f32,
    /// Bytes of RAM in use
    pub memory_used: u64,
    /// First CPU sensor reading in Celsius, 0 when none is exposed
    pub temperature: f32,
}

/// Outcome of re-verifying a found share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareResult {
    /// The share's digest meets the target
    Verified,
    /// Recomputation disagreed with the scanner
    Rejected,
}

/// Shared totals, fed by listener threads
struct Counters {
    hashes: AtomicU64,
    verified: AtomicU64,
    rejected: AtomicU64,
    started: Instant,
    reporting: AtomicBool,
}

impl Counters {
    fn new() -> Self {
        Counters {
            hashes: AtomicU64::new(0),
            verified: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            started: Instant::now(),
            reporting: AtomicBool::new(false),
        }
    }

    /// Snapshot with the recent rate measured from `since_hashes` over `window`
    fn snapshot(&self, since_hashes: u64, window: Duration) -> MiningStats {
        let hashes = self.hashes.load(Ordering::Relaxed);
        let verified = self.verified.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);

        MiningStats {
            hashes_total: hashes,
            shares_found: verified + rejected,
            shares_verified: verified,
            shares_rejected: rejected,
            avg_hashrate: rate(hashes, self.started.elapsed()),
            recent_hashrate: rate(hashes.saturating_sub(since_hashes), window),
        }
    }
}

fn rate(hashes: u64, window: Duration) -> f64 {
    let seconds = window.as_secs_f64();
    if seconds > 0.0 { hashes as f64 / seconds } else { 0.0 }
}

/// CPU, memory and temperature sampler
struct HardwareMonitor {
    system: System,
    components: Components,
}

impl HardwareMonitor {
    fn new() -> Self {
        HardwareMonitor {
            system: System::new(),
            components: Components::new_with_refreshed_list(),
        }
    }

    fn sample(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpus = self.system.cpus();
        let cpu_usage = match cpus.len() {
            0 => 0.0,
            n => cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / n as f32,
        };
        let temperature = self
            .components
            .iter()
            .filter(|c| c.label().contains("CPU"))
            .find_map(|c| c.temperature())
            .unwrap_or(0.0);

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }
}

/// Collects hash counts and share verdicts, and logs them periodically
///
/// Workers and the share consumer never touch the counters directly; they
/// get channel senders and a background thread per channel folds the
/// messages in.
pub struct StatsReporter {
    counters: Arc<Counters>,
    hardware: HardwareMonitor,
    report_interval: Duration,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl StatsReporter {
    /// Creates a reporter that logs every `report_interval` once started
    pub fn new(report_interval: Duration) -> Self {
        StatsReporter {
            counters: Arc::new(Counters::new()),
            hardware: HardwareMonitor::new(),
            report_interval,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Sender for share verdicts; each message bumps one counter
    pub fn share_sender(&self) -> Sender<ShareResult> {
        self.listen(|counters, verdict| {
            let counter = match verdict {
                ShareResult::Verified => &counters.verified,
                ShareResult::Rejected => &counters.rejected,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Sender for per-scan hash counts
    ///
    /// The scheduler hands this to every worker, which sends the
    /// `hashes_done` of each scan call.
    pub fn hash_sender(&self) -> Sender<u64> {
        self.listen(|counters, count| {
            counters.hashes.fetch_add(count, Ordering::Relaxed);
        })
    }

    /// Spawns a thread applying `apply` to every message until all senders are gone
    fn listen<T, F>(&self, apply: F) -> Sender<T>
    where
        T: Send + 'static,
        F: Fn(&Counters, T) + Send + 'static,
    {
        let (tx, rx): (Sender<T>, Receiver<T>) = crossbeam_channel::unbounded();
        let counters = self.counters.clone();
        let handle = std::thread::spawn(move || {
            for message in rx {
                apply(&counters, message);
            }
        });
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(handle);
        }
        tx
    }

    /// Waits until every message sent so far has been counted
    ///
    /// Returns once all senders handed out by this reporter are dropped, so
    /// drop them (and anything holding clones, like a stopped scheduler)
    /// before calling this, or it blocks.
    pub fn join_listeners(&self) {
        let handles = match self.listeners.lock() {
            Ok(mut listeners) => std::mem::take(&mut *listeners),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Statistics listener panicked");
            }
        }
    }

    /// Totals since creation
    ///
    /// # Returns
    /// A snapshot whose recent rate equals the average rate
    pub fn get_stats(&self) -> MiningStats {
        self.counters.snapshot(0, self.counters.started.elapsed())
    }

    /// Samples host load
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.hardware.sample()
    }

    /// Starts the periodic log line; a second call is a no-op
    ///
    /// The thread logs once per interval until [`StatsReporter::stop_reporting`].
    pub fn start_reporting(&self) {
        if self.counters.reporting.swap(true, Ordering::SeqCst) {
            return;
        }
        let counters = self.counters.clone();
        let interval = self.report_interval;

        std::thread::spawn(move || {
            let mut hardware = HardwareMonitor::new();
            let mut last_hashes = 0;
            let mut last_tick = Instant::now();

            while counters.reporting.load(Ordering::SeqCst) {
                std::thread::sleep(interval);
                let stats = counters.snapshot(last_hashes, last_tick.elapsed());
                let hw = hardware.sample();
                last_hashes = stats.hashes_total;
                last_tick = Instant::now();

                log::info!(
                    "{:.2} H/s (avg {:.2}) | shares ok/bad {}/{} | cpu {:.1}% | temp {:.1}°C",
                    stats.recent_hashrate,
                    stats.avg_hashrate,
                    stats.shares_verified,
                    stats.shares_rejected,
                    hw.cpu_usage,
                    hw.temperature
                );
            }
        });
    }

    /// Stops the periodic log line after the current sleep
    pub fn stop_reporting(&self) {
        self.counters.reporting.store(false, Ordering::SeqCst);
    }
}
