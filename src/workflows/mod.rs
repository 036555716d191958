// Provisioning workflow modules
// Every procedure is a linear, fail-fast pipeline of named steps

pub mod error;
pub mod pipeline;

pub use error::ProvisionError;
pub use pipeline::{Pipeline, RunReport, Step, StepAction, StepContext, StepRecord};
