// src/utils/error.rs
use crate::miner::scheduler;
use std::io;
use thiserror::Error;

/// Main error type for the scanning engine
///
/// Only configuration, context-lifecycle and input problems are errors.
/// Range exhaustion and cancellation are ordinary scan outcomes and never
/// surface through this type.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Algorithm name not present in the registry
    #[error("Unknown algorithm: {name}")]
    UnknownAlgorithm {
        /// Name as given by the user
        name: String,
    },

    /// Scratch buffer for a hash context could not be allocated
    #[error("Allocation error for {algorithm}: {bytes} bytes ({detail})")]
    AllocationError {
        /// Algorithm whose context failed to initialize
        algorithm: &'static str,
        /// Requested scratch size
        bytes: usize,
        /// Cost parameters that produced the request
        detail: String,
    },

    /// Every worker failed to initialize its hash context
    #[error("No usable workers for {algorithm} ({requested} requested)")]
    NoUsableWorkers {
        /// Algorithm being started
        algorithm: &'static str,
        /// Number of workers that were spawned
        requested: usize,
    },

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid user input (job files, hex, nonce ranges)
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),
}

/// Converts crossbeam channel send errors for Shares into MinerError
///
/// Happens when the consumer of found shares has gone away.
impl From<crossbeam_channel::SendError<scheduler::Share>> for MinerError {
    fn from(e: crossbeam_channel::SendError<scheduler::Share>) -> Self {
        MinerError::ChannelError(format!("Share send failed: {}", e))
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when job files carry malformed headers, targets or coinbase data.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts TOML parse errors into MinerError
impl From<toml::de::Error> for MinerError {
    fn from(e: toml::de::Error) -> Self {
        MinerError::ConfigError(format!("Invalid config format: {}", e))
    }
}
