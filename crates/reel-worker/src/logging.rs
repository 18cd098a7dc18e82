//! Structured run logging utilities.
//!
//! Provides consistent, structured logging for montage runs with
//! tracing spans and contextual information.

use reel_models::RunId;
use tracing::{error, info, warn, Span};

/// Run logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    source_id: String,
    operation: String,
}

impl RunLogger {
    /// Create a new logger for a run of `operation` against `source_id`.
    pub fn new(run_id: &RunId, source_id: &str, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            source_id: source_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    /// Log a progress update during the run.
    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    /// Log a warning during the run.
    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    /// Log an error during the run.
    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    /// Log the completion of a run.
    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Create a tracing span covering the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            source_id = %self.source_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, "748231", "montage");

        assert_eq!(logger.run_id(), run_id.to_string());
        assert_eq!(logger.source_id(), "748231");
    }
}
