use std::sync::Arc;

use crate::external::ProcessCommandExecutor;
use crate::fs::StandardFileSystem;
use crate::git::Git2Operations;
use crate::workflows::{Pipeline, StepContext};

pub mod bootstrap;
pub mod deploy;
pub mod status;
pub mod tune;

/// Context backed by the real host: child processes, the local filesystem and libgit2
pub fn host_context() -> StepContext {
    StepContext::new(
        Arc::new(ProcessCommandExecutor),
        Arc::new(StandardFileSystem),
        Arc::new(Git2Operations::new()),
    )
}

/// Print a planned pipeline for `--dry-run`
pub fn print_plan(pipeline: &Pipeline) {
    println!("🔍 Dry run: {} would run {} steps", pipeline.name, pipeline.steps.len());
    for (index, line) in pipeline.describe().iter().enumerate() {
        println!("   {:>2}. {}", index + 1, line);
    }
}
