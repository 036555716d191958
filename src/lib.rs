// srs-provision library - idempotent srsRAN host provisioning
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod credentials;
pub mod external;
pub mod fs;
pub mod git;
pub mod marker;
pub mod observability;
pub mod procedures;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::{LogFormat, ProvisionConfig, StaleCheckoutPolicy};
pub use credentials::{AccessToken, RegistryCredentials};
pub use external::{CommandError, CommandExecutor, CommandOutput, Invocation, ProcessCommandExecutor};
pub use fs::{FileSystemOperations, StandardFileSystem};
pub use git::{Git2Operations, SourceControl};
pub use marker::MarkerStatus;
pub use observability::{create_procedure_span, OperationTimer};
pub use procedures::UsageError;
pub use telemetry::{generate_run_id, init_telemetry};
pub use workflows::{Pipeline, ProvisionError, RunReport, Step, StepAction, StepContext};
