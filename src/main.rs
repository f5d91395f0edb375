//! varmon - variable monitoring engine
//!
//! A command-line tool for evaluating device model monitors and printing the
//! notification events a charge-point controller would send.

use clap::Parser;
use varmon::cli::args::{generate_completions, Cli, Commands};
use varmon::commands::{run_check, run_feed, run_monitoring, run_monitors};
use varmon::config::{Config, ConfigBuilder};
use varmon::domain::Severity;
use varmon::error::{AppError, ConfigError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Commands::Monitors => run_monitors(&load_config(cli)?, cli.format),

        Commands::Check => run_check(cli.config.as_deref(), cli.format),

        Commands::Feed(args) => run_feed(args, &load_config(cli)?, cli.format),

        Commands::Run(args) => run_monitoring(args, &load_config(cli)?, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let offline_severity = cli.offline_severity.map(Severity::new).transpose()?;
    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_ack_on_handoff(cli.no_ack.then_some(false))
        .with_offline_severity(offline_severity)
        .build();

    if config.general.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }
    Ok(config)
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Config(ConfigError::FileNotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Run without --config to use the default locations:");
            eprintln!("      /etc/varmon/config.toml, ~/.config/varmon/config.toml, ./varmon.toml");
        }
        AppError::VariableNotFound { .. } => {
            eprintln!();
            eprintln!("Hint: Use 'varmon monitors' to see the configured variables.");
        }
        _ => {}
    }
}
