use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::LogFormat;

/// Initialize tracing.
///
/// Logs go to stderr so stdout stays reserved for operator-facing output
/// (progress lines, usage, dry-run plans). RUST_LOG wins over `level`.
pub fn init_telemetry(format: LogFormat, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::debug!("srs-provision telemetry initialized");
    Ok(())
}

/// Generate a run ID for linking the log lines of one invocation
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}
