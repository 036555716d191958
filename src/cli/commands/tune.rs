use anyhow::Result;
use tracing::Instrument;

use crate::cli::commands::print_plan;
use crate::config::ProvisionConfig;
use crate::observability::create_procedure_span;
use crate::procedures::tune;
use crate::telemetry::generate_run_id;
use crate::workflows::StepContext;

pub struct TuneCommand {
    pub config: ProvisionConfig,
    pub dry_run: bool,
}

impl TuneCommand {
    pub fn new(config: ProvisionConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self, ctx: &StepContext) -> Result<()> {
        if self.dry_run {
            // Dry runs never query the host, so an unconfigured SDR interface stays symbolic
            let placeholder = format!("<interface with {}>", self.config.tune.sdr.address);
            let iface = self
                .config
                .tune
                .sdr
                .interface
                .clone()
                .unwrap_or(placeholder);
            print_plan(&tune::plan(&self.config, Some(&iface)));
            return Ok(());
        }

        println!("🎛️  Tuning host");
        let span = create_procedure_span("tune", &generate_run_id());
        let report = tune::run(&self.config, ctx).instrument(span).await?;

        if !report.steps.is_empty() {
            println!("✅ Host tuned ({} steps)", report.steps.len());
        }
        Ok(())
    }
}
