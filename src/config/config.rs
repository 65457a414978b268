// src/config/config.rs
use crate::miner::algorithm::{AlgorithmParams, registry, scrypt};
use crate::miner::target::{FilterBucket, MaskTable};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the scanning engine
///
/// Contains all settings needed for a run: algorithm selection, worker
/// count, scan granularity, cost parameters and the optional custom
/// filter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Algorithm to use (e.g., "sha256d", "scrypt")
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Number of worker threads
    /// (0 = number of CPU cores)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Nonces covered by one scan call; bounds restart latency
    /// (default: 65536)
    #[serde(default = "default_scan_chunk")]
    pub scan_chunk: u64,

    /// Seconds between statistics log lines
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Cost parameters for time-scaled algorithms
    #[serde(default)]
    pub params: AlgorithmParams,

    /// Custom filter table; empty means the built-in one
    #[serde(default)]
    pub filter: Vec<FilterBucket>,
}

fn default_algorithm() -> String {
    "sha256d".into()
}

fn default_worker_threads() -> usize {
    0
}

fn default_scan_chunk() -> u64 {
    0x10000
}

fn default_report_interval() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            algorithm: default_algorithm(),
            worker_threads: default_worker_threads(),
            scan_chunk: default_scan_chunk(),
            report_interval_secs: default_report_interval(),
            params: AlgorithmParams::default(),
            filter: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(MinerError)` - If file couldn't be read, parsed or validated
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), MinerError> {
        registry::lookup(&self.algorithm)?;
        if self.scan_chunk == 0 {
            return Err(MinerError::ConfigError("scan_chunk must be at least 1".into()));
        }
        if self.params.nfactor_min > self.params.nfactor_max {
            return Err(MinerError::ConfigError(format!(
                "nfactor_min ({}) exceeds nfactor_max ({})",
                self.params.nfactor_min, self.params.nfactor_max
            )));
        }
        if self.params.nfactor_max > scrypt::NFACTOR_MAX {
            return Err(MinerError::ConfigError(format!(
                "nfactor_max may not exceed {}",
                scrypt::NFACTOR_MAX
            )));
        }
        self.mask_table().map(|_| ())
    }

    /// Worker count with 0 resolved to the number of CPU cores
    pub fn worker_count(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }

    /// Filter table to scan with
    pub fn mask_table(&self) -> Result<MaskTable, MinerError> {
        if self.filter.is_empty() {
            Ok(MaskTable::default())
        } else {
            MaskTable::new(self.filter.clone())
        }
    }

    /// Generates a configuration template string
    ///
    /// # Arguments
    /// * `with_filter` - Write the coarse filter table as `[[filter]]` entries
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template(with_filter: bool) -> String {
        let names: Vec<_> = registry::list().iter().map(|a| a.name()).collect();
        let params = AlgorithmParams::default();

        let mut template = String::new();
        template.push_str("# powscan configuration\n\n");
        template.push_str(&format!("# Supported algorithms: {}\n", names.join(", ")));
        template.push_str(&format!("algorithm = \"{}\"\n", default_algorithm()));
        template.push_str("# Number of worker threads (0 = auto-detect)\n");
        template.push_str("worker_threads = 0\n");
        template.push_str("# Nonces per scan call; smaller values react faster to new jobs\n");
        template.push_str(&format!("scan_chunk = {}\n", default_scan_chunk()));
        template.push_str("# Seconds between statistics lines\n");
        template.push_str(&format!("report_interval_secs = {}\n\n", default_report_interval()));

        template.push_str("# Cost schedule for scrypt-n\n");
        template.push_str("[params]\n");
        template.push_str(&format!("nfactor_start_time = {}\n", params.nfactor_start_time));
        template.push_str(&format!("nfactor_min = {}\n", params.nfactor_min));
        template.push_str(&format!("nfactor_max = {}\n", params.nfactor_max));

        if with_filter {
            template.push_str("\n# Coarse filter table (thresholds ascending, last one 4294967295)\n");
            for bucket in MaskTable::coarse().buckets() {
                template.push_str("[[filter]]\n");
                template.push_str(&format!("threshold = {}\n", bucket.threshold));
                template.push_str(&format!("mask = {}\n", bucket.mask));
            }
        }

        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn templates_parse_and_validate() {
        for with_filter in [false, true] {
            let config: Config = toml::from_str(&Config::generate_template(with_filter)).unwrap();
            config.validate().unwrap();
            assert_eq!(config.filter.is_empty(), !with_filter);
        }
        let config: Config = toml::from_str(&Config::generate_template(true)).unwrap();
        assert_eq!(config.mask_table().unwrap(), MaskTable::coarse());
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let config = Config {
            algorithm: "x11".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(MinerError::UnknownAlgorithm { .. })));
    }

    #[test]
    fn rejects_bad_params_and_filters() {
        let inverted = Config {
            params: AlgorithmParams {
                nfactor_min: 12,
                nfactor_max: 8,
                ..AlgorithmParams::default()
            },
            ..Config::default()
        };
        assert!(inverted.validate().is_err());

        let unsound = Config {
            filter: vec![FilterBucket {
                threshold: u32::MAX,
                mask: 1,
            }],
            ..Config::default()
        };
        assert!(unsound.validate().is_err());

        let zero_chunk = Config {
            scan_chunk: 0,
            ..Config::default()
        };
        assert!(zero_chunk.validate().is_err());
    }

    #[test]
    fn partial_params_fill_defaults() {
        let config: Config = toml::from_str("algorithm = \"scrypt-n\"\n[params]\nnfactor_min = 6\n").unwrap();
        assert_eq!(config.params.nfactor_min, 6);
        assert_eq!(config.params.nfactor_max, AlgorithmParams::default().nfactor_max);
    }
}
