use std::path::PathBuf;
use thiserror::Error;

use crate::external::CommandError;

/// Why a provisioning run stopped.
///
/// Every variant produced by the pipeline names the step that failed.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("step '{step}' failed with exit status {status}{}", detail_suffix(.detail))]
    StepFailed {
        step: String,
        status: i32,
        detail: Option<String>,
    },
    #[error("step '{step}' could not start: {source}")]
    Spawn {
        step: String,
        #[source]
        source: CommandError,
    },
    #[error("step '{step}' failed: {message}")]
    Step { step: String, message: String },
    #[error(
        "step '{step}': {} already exists from an earlier run (policy 'fail'); remove it or change the stale checkout policy",
        .dir.display()
    )]
    StaleCheckout { step: String, dir: PathBuf },
    #[error("configuration error: {0}")]
    Config(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl ProvisionError {
    /// Wrap a library error raised while running `step`
    pub fn step(step: &str, error: anyhow::Error) -> Self {
        ProvisionError::Step {
            step: step.to_string(),
            message: format!("{error:#}"),
        }
    }

    pub fn step_name(&self) -> Option<&str> {
        match self {
            ProvisionError::StepFailed { step, .. }
            | ProvisionError::Spawn { step, .. }
            | ProvisionError::Step { step, .. }
            | ProvisionError::StaleCheckout { step, .. } => Some(step),
            ProvisionError::Config(_) => None,
        }
    }

    /// Process exit status for this failure: the failing command's own status
    /// when it has a usable one, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::StepFailed { status, .. } if (1..=255).contains(status) => *status,
            _ => 1,
        }
    }
}
