use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::LogFormat;

pub mod commands;

#[derive(Parser)]
#[command(name = "srs-provision")]
#[command(about = "Idempotent srsRAN host provisioning")]
#[command(long_about = "srs-provision prepares a host for srsRAN experiments: it installs the container \
                       runtime and logs in to the registry ('bootstrap'), builds and installs srsRAN at a \
                       pinned revision exactly once ('deploy'), and tunes the host network path ('tune').")]
pub struct Cli {
    /// Configuration file (defaults to ./srs-provision.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the planned steps without running anything
    #[arg(long, global = true, help = "Show what would be run without making changes")]
    pub dry_run: bool,

    /// Log output format (overrides logging.format)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the container runtime, clone auxiliary repositories and log in to the registry
    Bootstrap {
        /// <access-token> <registry-username> <registry-password>
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Build and install srsRAN at a pinned revision (skipped once completed)
    Deploy {
        /// <commit-hash>
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Configure NAT, the CPU governor and the SDR network interface
    Tune,
    /// Report whether srsRAN has already been deployed
    Status {
        /// Emit the report as JSON
        #[arg(long, help = "Print the status report as JSON")]
        json: bool,
        /// Also print the effective configuration
        #[arg(long, help = "Print the effective configuration as TOML")]
        show_config: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments_are_collected_verbatim() {
        let cli = Cli::try_parse_from(["srs-provision", "bootstrap", "tok", "user", "-p4ss"]).unwrap();
        match cli.command {
            Commands::Bootstrap { args } => assert_eq!(args, vec!["tok", "user", "-p4ss"]),
            _ => panic!("expected bootstrap"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "srs-provision",
            "deploy",
            "--dry-run",
            "--log-format",
            "json",
            "abc123",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Commands::Deploy { args } => assert_eq!(args, vec!["abc123"]),
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_missing_positionals_still_parse() {
        let cli = Cli::try_parse_from(["srs-provision", "deploy"]).unwrap();
        assert!(matches!(cli.command, Commands::Deploy { args } if args.is_empty()));
    }
}
