//! CLI interface module
//!
//! This module provides command-line interface functionality for rentroute.

pub mod commands;

use crate::cli::{Commands, ConfigCommands};
use commands::{config_generate, print_deep_link, show_error_stats};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    #[cfg(feature = "cli")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::RentrouteError> for CliError {
    fn from(err: crate::errors::RentrouteError) -> Self {
        use crate::errors::RentrouteError;
        match err {
            RentrouteError::Validation(_)
            | RentrouteError::DateParse(_)
            | RentrouteError::PartnerNotFound(_) => CliError::ParseError(err.to_string()),
            _ => CliError::StorageError(err.to_string()),
        }
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Link {
            partner,
            pickup,
            pickup_date,
            pickup_time,
            dropoff_date,
            dropoff_time,
            dropoff,
            code,
            location_id,
            location_type,
            click_id,
        } => {
            let search = commands::LinkArgs {
                partner,
                pickup,
                pickup_date,
                pickup_time,
                dropoff_date,
                dropoff_time,
                dropoff,
                code,
                location_id,
                location_type,
                click_id,
            };
            print_deep_link(&search)
        }

        Commands::Errors { days } => show_error_stats(days).await,

        Commands::Config { action } => match action {
            ConfigCommands::Generate { output_path, force } => {
                config_generate(output_path, force).await
            }
        },

        Commands::Serve { .. } => Err(CliError::CommandError(
            "serve is handled by the server runtime".to_string(),
        )),
    }
}
