//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// NetFlow Collector - receives NetFlow v5 over UDP and writes JSON batches
#[derive(Parser, Debug)]
#[command(
    name = "netflow-collector",
    author,
    version,
    about = "NetFlow v5 collector",
    long_about = "Receives NetFlow v5 export datagrams over UDP, decodes them to JSON and\n\
                  writes fixed-size batches to local files and/or a distributed filesystem,\n\
                  optionally publishing every flow to Kafka."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "NETFLOW_COLLECTOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "NETFLOW_COLLECTOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Also append logs to <DIR>/netflow-collector.log
    #[arg(long, global = true, env = "NETFLOW_COLLECTOR_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the collector until Ctrl+C / SIGTERM
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (JSON or TOML)
    #[arg(
        short,
        long,
        default_value = "config.json",
        env = "NETFLOW_COLLECTOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the listen address from configuration ([host]:port)
    #[arg(long, env = "NETFLOW_COLLECTOR_LISTEN")]
    pub listen: Option<String>,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "NETFLOW_COLLECTOR_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without starting the collector
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.json", env = "NETFLOW_COLLECTOR_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json", env = "NETFLOW_COLLECTOR_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["netflow-collector", "run"]).unwrap();
        let Commands::Run(ref args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.metrics_port, 0);
        assert!(args.listen.is_none());
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "netflow-collector",
            "-vv",
            "--log-dir",
            "/var/log/netflow",
            "run",
            "--config",
            "collector.toml",
            "--listen",
            ":9995",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), "trace");
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/netflow")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.listen.as_deref(), Some(":9995"));
        assert_eq!(args.config, PathBuf::from("collector.toml"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["netflow-collector", "-q", "-v", "info"]).is_err());
        let cli = Cli::try_parse_from(["netflow-collector", "-q", "info"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }
}
