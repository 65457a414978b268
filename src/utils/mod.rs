// src/utils/mod.rs
//! Error type and logger setup shared by the engine and the binary

/// [`MinerError`] and its conversions
pub mod error;

/// `env_logger` initialization
pub mod logging;

pub use error::MinerError;
pub use logging::{init_bench_logging, init_logging};
