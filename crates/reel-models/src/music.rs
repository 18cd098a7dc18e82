//! Music bed references.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the music bed for a montage comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MusicReference {
    /// Track from the music library, by file name
    Library(String),
    /// File uploaded alongside the request. The run that receives it owns it
    /// and deletes it during cleanup.
    Uploaded(PathBuf),
}

impl MusicReference {
    /// Path of the owned upload, if any.
    pub fn owned_path(&self) -> Option<&Path> {
        match self {
            MusicReference::Uploaded(path) => Some(path),
            MusicReference::Library(_) => None,
        }
    }
}
