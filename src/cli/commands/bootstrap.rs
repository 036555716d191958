use anyhow::Result;
use tracing::Instrument;

use crate::cli::commands::print_plan;
use crate::config::ProvisionConfig;
use crate::observability::create_procedure_span;
use crate::procedures::bootstrap::{self, BootstrapArgs};
use crate::telemetry::generate_run_id;
use crate::workflows::StepContext;

pub struct BootstrapCommand {
    pub config: ProvisionConfig,
    pub args: BootstrapArgs,
    pub dry_run: bool,
}

impl BootstrapCommand {
    pub fn new(config: ProvisionConfig, args: BootstrapArgs) -> Self {
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
        if self.dry_run {
            let user = bootstrap::resolve_runtime_user(&self.config)
                .unwrap_or_else(|_| "<invoking user>".to_string());
            print_plan(&bootstrap::plan(&self.config, &self.args, &user));
            return Ok(());
        }

        println!("🐳 Bootstrapping host for {}", self.args.registry.username);
        let span = create_procedure_span("bootstrap", &generate_run_id());
        let report = bootstrap::run(&self.config, &self.args, ctx)
            .instrument(span)
            .await?;

        println!(
            "✅ Host bootstrapped in {} steps ({:.1}s)",
            report.steps.len(),
            report.total_duration().as_secs_f64()
        );
        Ok(())
    }
}
