//! Command-line interface definitions using clap

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};

use crate::models::hhmm;

/// Rentroute - car-rental affiliate deep-link router
#[derive(Parser)]
#[command(name = "rentroute")]
#[command(version)]
#[command(about = "Car-rental affiliate deep-link router", long_about = None)]
pub struct Cli {
    /// Config file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve {
        /// Use in-process storage instead of the configured database
        #[arg(long)]
        memory: bool,
    },

    /// Print a partner deep link for a search
    Link {
        /// Partner name (kayak, skyscanner, autorentals)
        partner: String,

        /// Pickup location text
        pickup: String,

        /// Pickup date (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        pickup_date: NaiveDate,

        /// Pickup time (HH:MM)
        #[arg(value_parser = parse_time)]
        pickup_time: NaiveTime,

        /// Dropoff date (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        dropoff_date: NaiveDate,

        /// Dropoff time (HH:MM)
        #[arg(value_parser = parse_time)]
        dropoff_time: NaiveTime,

        /// Different dropoff location text
        #[arg(long)]
        dropoff: Option<String>,

        /// Location code (IATA or partner code)
        #[arg(long)]
        code: Option<String>,

        /// Composite location id (e.g. lhr-a1)
        #[arg(long)]
        location_id: Option<String>,

        /// Location type
        #[arg(long, value_enum, default_value_t = LocationKindArg::Airport)]
        location_type: LocationKindArg,

        /// Click id to embed (random when omitted)
        #[arg(long)]
        click_id: Option<String>,
    },

    /// Show error log statistics from the configured database
    Errors {
        /// Look-back window in days
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocationKindArg {
    Airport,
    City,
    Location,
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    hhmm::parse(s).ok_or_else(|| format!("invalid time '{}', expected HH:MM", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_command() {
        let cli = Cli::parse_from([
            "rentroute",
            "link",
            "kayak",
            "London Heathrow",
            "2025-06-01",
            "10:00",
            "2025-06-04",
            "12:00",
            "--code",
            "LHR",
        ]);
        match cli.command {
            Some(Commands::Link {
                partner,
                pickup_date,
                pickup_time,
                code,
                location_type,
                ..
            }) => {
                assert_eq!(partner, "kayak");
                assert_eq!(pickup_date.to_string(), "2025-06-01");
                assert_eq!(hhmm::format(&pickup_time), "10:00");
                assert_eq!(code.as_deref(), Some("LHR"));
                assert_eq!(location_type, LocationKindArg::Airport);
            }
            _ => panic!("expected link command"),
        }
    }

    #[test]
    fn test_rejects_bad_time() {
        let result = Cli::try_parse_from([
            "rentroute",
            "link",
            "kayak",
            "LHR",
            "2025-06-01",
            "25:99",
            "2025-06-04",
            "12:00",
        ]);
        assert!(result.is_err());
    }
}
