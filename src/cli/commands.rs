// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// powscan CLI - multi-algorithm CPU proof-of-work nonce scanner
#[derive(Parser, Debug)]
#[command(name = "powscan")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (scan a job, run benchmarks, generate config, list algorithms)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the scanner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Scan a job file and print found shares as JSON lines
    Mine(MineOptions),

    /// Run performance benchmarks for an algorithm
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),

    /// List the registered algorithms
    Algorithms,
}

/// Options for scanning a job
#[derive(Parser, Debug)]
pub struct MineOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to the JSON job file
    #[arg(short, long)]
    pub job: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Algorithm to use (overrides config)
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Stop after this many verified shares (0 = until the nonce space is exhausted)
    #[arg(short, long, default_value_t = 1)]
    pub max_shares: u64,

    /// Give up after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Options for running benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Path to configuration file (cost parameters and filter table)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Algorithm to benchmark
    #[arg(short, long, default_value = "sha256d")]
    pub algorithm: String,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,

    /// Include a custom filter table section
    #[arg(short, long)]
    pub filter: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mine_with_overrides() {
        let cli = Commands::parse_from([
            "powscan", "mine", "--job", "job.json", "-w", "2", "-a", "scrypt", "--max-shares", "3",
        ]);
        match cli.action {
            Action::Mine(opts) => {
                assert_eq!(opts.job, PathBuf::from("job.json"));
                assert_eq!(opts.config, PathBuf::from("config.toml"));
                assert_eq!(opts.workers, Some(2));
                assert_eq!(opts.algorithm.as_deref(), Some("scrypt"));
                assert_eq!(opts.max_shares, 3);
                assert_eq!(opts.timeout, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn parses_config_and_algorithms() {
        let cli = Commands::parse_from(["powscan", "config", "--filter", "-o", "out.toml"]);
        assert!(matches!(cli.action, Action::Config(ConfigOptions { filter: true, .. })));

        let cli = Commands::parse_from(["powscan", "algorithms"]);
        assert!(matches!(cli.action, Action::Algorithms));
    }

    #[test]
    fn parses_benchmark_with_config() {
        let cli = Commands::parse_from(["powscan", "benchmark", "-c", "bench.toml", "-a", "axiom", "-d", "5"]);
        match cli.action {
            Action::Benchmark(opts) => {
                assert_eq!(opts.config, PathBuf::from("bench.toml"));
                assert_eq!(opts.algorithm, "axiom");
                assert_eq!(opts.duration, 5);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Commands::command().debug_assert();
    }
}
