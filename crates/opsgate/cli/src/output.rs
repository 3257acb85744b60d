//! Output formatting utilities

use colored::*;
use serde::Serialize;

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Print a single item as pretty JSON
pub fn print_json<T: Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
