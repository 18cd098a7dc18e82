//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("Run not found: {0}")]
    NotFound(String),

    #[error("Run not ready: {0}")]
    NotReady(String),

    #[error("Path outside output directory: {}", .0.display())]
    PathRejected(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailure(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailure(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error is reported synchronously to the submitter
    /// instead of failing a run.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WorkerError::InvalidRequest(_) | WorkerError::SourceUnavailable(_)
        )
    }
}

impl From<validator::ValidationErrors> for WorkerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidRequest(errors.to_string())
    }
}
