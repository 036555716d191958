use std::time::{Duration, Instant};
use tracing::info;

/// Create the span every procedure runs inside
pub fn create_procedure_span(procedure: &str, run_id: &str) -> tracing::Span {
    tracing::info_span!(
        "procedure",
        procedure.name = procedure,
        run.id = run_id,
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
        duration
    }
}
