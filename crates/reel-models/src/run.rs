//! Montage run definitions.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a montage run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Background pipeline is running
    #[default]
    Processing,
    /// Montage rendered successfully
    Completed,
    /// Pipeline failed at some stage
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable state of one montage run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Run {
    /// Unique run ID
    pub id: RunId,
    /// Current status
    pub status: RunStatus,
    /// Progress (0-100)
    pub progress: u8,
    /// Human-readable progress message
    pub message: String,
    /// Rendered montage, set once the run completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Run {
    /// Create a run in the initial processing state.
    pub fn new(id: RunId, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: RunStatus::Processing,
            progress: 0,
            message: message.into(),
            result_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Raise progress and replace the message. Progress never moves backwards.
    pub fn set_progress(&mut self, progress: u8, message: impl Into<String>) {
        self.progress = self.progress.max(progress.min(100));
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    /// Mark as completed with the rendered output.
    pub fn set_completed(&mut self, result_path: PathBuf, message: impl Into<String>) {
        self.status = RunStatus::Completed;
        self.progress = 100;
        self.message = message.into();
        self.result_path = Some(result_path);
        self.updated_at = Utc::now();
    }

    /// Mark as failed.
    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.message = message.into();
        self.updated_at = Utc::now();
    }
}
