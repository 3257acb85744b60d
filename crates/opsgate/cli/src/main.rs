//! OpsGate CLI - operator commands
//!
//! - `bootstrap-admin`: grant the admin role to one user (merge write)
//! - `check-admin`: show how a user's admin capability resolves
//! - `config`: print the effective configuration

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use opsgate_config::GateConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;
mod store;

use commands::{bootstrap, check};
use error::CliResult;
use output::{print_error, print_json, OutputFormat};

/// OpsGate CLI application
#[derive(Parser)]
#[command(name = "opsgate")]
#[command(about = "OpsGate - admin bootstrap and capability checks", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "OPSGATE_CONFIG")]
    config: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level (overrides logging.level)
    #[arg(long, env = "OPSGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Grant the admin role to the configured user
    BootstrapAdmin(bootstrap::BootstrapArgs),

    /// Resolve a user's admin capability
    CheckAdmin(check::CheckArgs),

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Logs go to stderr so command output on stdout stays machine-readable.
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(cli: Cli, config: GateConfig) -> CliResult<()> {
    match cli.command {
        Commands::BootstrapAdmin(args) => bootstrap::execute(args, &config, cli.output).await,
        Commands::CheckAdmin(args) => check::execute(args, &config, cli.output).await,
        Commands::Config => print_json(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = GateConfig::load(cli.config.as_deref());
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json_logs = cli.json_logs || config.as_ref().is_ok_and(|c| c.logging.json);
    init_tracing(&level, json_logs);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
