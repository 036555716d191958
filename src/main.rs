use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use srs_provision::cli::commands::bootstrap::BootstrapCommand;
use srs_provision::cli::commands::deploy::DeployCommand;
use srs_provision::cli::commands::status::StatusCommand;
use srs_provision::cli::commands::tune::TuneCommand;
use srs_provision::cli::commands::host_context;
use srs_provision::cli::{Cli, Commands};
use srs_provision::procedures::bootstrap::BootstrapArgs;
use srs_provision::procedures::deploy::DeployArgs;
use srs_provision::{init_telemetry, ProvisionConfig, ProvisionError, UsageError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(usage) = e.downcast_ref::<UsageError>() {
                println!("{usage}");
                return ExitCode::from(1);
            }
            eprintln!("❌ {e:#}");
            let code = e
                .downcast_ref::<ProvisionError>()
                .map(ProvisionError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Argument counts are checked before anything touches the host
    let command = Validated::from_cli(&cli.command)?;

    ProvisionConfig::load_env_file()?;
    let config = ProvisionConfig::load(cli.config.as_deref())?;
    let log_format = cli.log_format.unwrap_or(config.logging.format);
    init_telemetry(log_format, &config.logging.level)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let ctx = host_context();
        match command {
            Validated::Bootstrap(args) => {
                BootstrapCommand::new(config, args)
                    .with_dry_run(cli.dry_run)
                    .execute(&ctx)
                    .await
            }
            Validated::Deploy(args) => {
                DeployCommand::new(config, args)
                    .with_dry_run(cli.dry_run)
                    .execute(&ctx)
                    .await
            }
            Validated::Tune => {
                TuneCommand::new(config)
                    .with_dry_run(cli.dry_run)
                    .execute(&ctx)
                    .await
            }
            Validated::Status { json, show_config } => {
                StatusCommand::new(config)
                    .with_json(json)
                    .with_show_config(show_config)
                    .execute(ctx.fs.as_ref())
                    .await
            }
        }
    })
}

enum Validated {
    Bootstrap(BootstrapArgs),
    Deploy(DeployArgs),
    Tune,
    Status { json: bool, show_config: bool },
}

impl Validated {
    fn from_cli(command: &Commands) -> Result<Self, UsageError> {
        Ok(match command {
            Commands::Bootstrap { args } => Validated::Bootstrap(BootstrapArgs::from_positional(args)?),
            Commands::Deploy { args } => Validated::Deploy(DeployArgs::from_positional(args)?),
            Commands::Tune => Validated::Tune,
            Commands::Status { json, show_config } => Validated::Status {
                json: *json,
                show_config: *show_config,
            },
        })
    }
}
