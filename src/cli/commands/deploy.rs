use anyhow::Result;
use tracing::Instrument;

use crate::cli::commands::print_plan;
use crate::config::ProvisionConfig;
use crate::marker::{self, MarkerStatus};
use crate::observability::create_procedure_span;
use crate::procedures::deploy::{self, DeployArgs, DeployOutcome};
use crate::telemetry::generate_run_id;
use crate::workflows::StepContext;

pub struct DeployCommand {
    pub config: ProvisionConfig,
    pub args: DeployArgs,
    pub dry_run: bool,
}

impl DeployCommand {
    pub fn new(config: ProvisionConfig, args: DeployArgs) -> Self {
        Self {
            config,
            args,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self, ctx: &StepContext) -> Result<()> {
        let marker_path = self.config.build.marker_path();

        if self.dry_run {
            if marker::check(ctx.fs.as_ref(), &marker_path) == MarkerStatus::AlreadyDone {
                println!(
                    "✅ Marker {} present; deploy would do nothing",
                    marker_path.display()
                );
                return Ok(());
            }
            print_plan(&deploy::plan(&self.config, &self.args));
            return Ok(());
        }

        println!("🏗️  Deploying srsRAN at {}", self.args.revision);
        let span = create_procedure_span("deploy", &generate_run_id());
        let outcome = deploy::run(&self.config, &self.args, ctx)
            .instrument(span)
            .await?;

        if let DeployOutcome::Deployed { marker, report } = outcome {
            println!();
            println!(
                "✅ srsRAN {} installed in {} steps ({:.1}s)",
                self.args.revision,
                report.steps.len(),
                report.total_duration().as_secs_f64()
            );
            println!("   Marker written to {}", marker.display());
        }
        Ok(())
    }
}
