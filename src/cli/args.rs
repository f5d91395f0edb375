//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Variable monitoring engine for charge-point controllers
///
/// Evaluates threshold, delta and periodic monitors against an in-memory
/// device model and prints the resulting notification events.
#[derive(Parser, Debug)]
#[command(name = "varmon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VARMON_CONFIG")]
    pub config: Option<String>,

    /// Do not treat a successful hand-off as delivery confirmation
    #[arg(long, global = true)]
    pub no_ack: bool,

    /// Override the offline queuing severity (0-9)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub offline_severity: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured monitors
    Monitors,

    /// Validate the configuration file
    Check,

    /// Write values to a variable and print the resulting events
    Feed(FeedArgs),

    /// Run the periodic timer and print events as they are generated
    Run(RunArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the feed command
#[derive(Parser, Debug)]
pub struct FeedArgs {
    /// Component name
    pub component: String,

    /// Variable name
    pub variable: String,

    /// Values to write, in order
    #[arg(required = true, num_args = 1..)]
    pub values: Vec<String>,

    /// Simulate a station without CSMS connection
    #[arg(long)]
    pub offline: bool,

    /// Run one periodic sweep after the last value
    #[arg(long)]
    pub sweep: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Exit after this many sweeps
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Sweep interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_monitors() {
        let args = Cli::try_parse_from(["varmon", "monitors"]).unwrap();
        assert!(matches!(args.command, Commands::Monitors));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["varmon", "-v", "check"]).unwrap();
        assert!(args.verbose);
        assert!(!args.no_ack);
    }

    #[test]
    fn test_cli_parse_feed() {
        let args = Cli::try_parse_from([
            "varmon",
            "feed",
            "EVSE",
            "Temperature",
            "70",
            "85",
            "60",
            "--offline",
        ])
        .unwrap();
        if let Commands::Feed(feed) = args.command {
            assert_eq!(feed.component, "EVSE");
            assert_eq!(feed.values, vec!["70", "85", "60"]);
            assert!(feed.offline);
            assert!(!feed.sweep);
        } else {
            panic!("Expected Feed command");
        }
    }

    #[test]
    fn test_cli_feed_requires_value() {
        let result = Cli::try_parse_from(["varmon", "feed", "EVSE", "Temperature"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_run_args() {
        let args =
            Cli::try_parse_from(["varmon", "run", "--ticks", "3", "--interval-ms", "250"]).unwrap();
        if let Commands::Run(run) = args.command {
            assert_eq!(run.ticks, Some(3));
            assert_eq!(run.interval_ms, Some(250));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_offline_severity_validation() {
        let args = Cli::try_parse_from(["varmon", "--offline-severity", "3", "check"]).unwrap();
        assert_eq!(args.offline_severity, Some(3));

        let result = Cli::try_parse_from(["varmon", "--offline-severity", "12", "check"]);
        assert!(result.is_err());
    }
}
