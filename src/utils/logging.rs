// src/utils/logging.rs
//! `env_logger` setup for the binary
//!
//! Scans log at info, benchmarks at debug so per-worker context events are
//! visible. `RUST_LOG` overrides either default. The scanning core only logs
//! lifecycle events, never per candidate.

use env_logger::{Builder, Env, Target};
use std::io::Write;

/// Initializes logging for scan runs (info unless `RUST_LOG` says otherwise)
pub fn init_logging() {
    let _ = builder("info").try_init();
}

/// Initializes logging for benchmarks (debug unless `RUST_LOG` says otherwise)
pub fn init_bench_logging() {
    let _ = builder("debug").try_init();
}

/// Stdout logger with `[ts LEVEL thread module:line] message` lines
///
/// Worker threads are named `worker-N`, so the thread column tells which
/// worker a context or job event came from.
fn builder(default_level: &'static str) -> Builder {
    let env = Env::default().default_filter_or(default_level);
    let mut builder = Builder::from_env(env);

    builder
        .format(|buf, record| {
            let thread = std::thread::current();
            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                thread.name().unwrap_or("-"),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
