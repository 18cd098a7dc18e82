//! Resolution of request references to files on disk.

use std::path::{Path, PathBuf};

use reel_models::{is_safe_identifier, MusicReference, RunId};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Where sources, music and rendered montages live.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    assets_dir: PathBuf,
    output_dir: PathBuf,
    source_bucket: Option<String>,
}

/// Media a run reads, resolved and checked to exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSources {
    /// Local source video
    pub video: PathBuf,
    /// Reference handed to the analysis service
    pub analysis_uri: String,
    /// Music bed
    pub music: PathBuf,
}

impl SourceLayout {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            assets_dir: config.assets_dir.clone(),
            output_dir: config.output_dir.clone(),
            source_bucket: config.source_bucket.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn source_file_name(source_id: &str) -> String {
        format!("source_{}_480p.mp4", source_id)
    }

    /// Local path of the source rendition for `source_id`.
    pub fn source_video(&self, source_id: &str) -> PathBuf {
        self.assets_dir
            .join("videos")
            .join(Self::source_file_name(source_id))
    }

    /// Reference the analysis service reads the source from.
    ///
    /// A bucket URI when a bucket is configured, the local path otherwise.
    pub fn analysis_uri(&self, source_id: &str) -> String {
        match &self.source_bucket {
            Some(bucket) => format!("gs://{}/{}", bucket, Self::source_file_name(source_id)),
            None => self.source_video(source_id).to_string_lossy().into_owned(),
        }
    }

    /// Local path of a library track.
    pub fn library_track(&self, name: &str) -> PathBuf {
        self.assets_dir.join("music").join(name)
    }

    /// Where the montage for `run_id` is rendered.
    pub fn output_path(&self, run_id: &RunId) -> PathBuf {
        self.output_dir.join(format!("final_montage_{}.mp4", run_id))
    }

    /// Resolve and check the media a request refers to.
    pub fn resolve(&self, source_id: &str, music: &MusicReference) -> WorkerResult<ResolvedSources> {
        if !is_safe_identifier(source_id) {
            return Err(WorkerError::invalid_request(format!(
                "Invalid source id '{}'",
                source_id
            )));
        }

        let video = self.source_video(source_id);
        if !video.is_file() {
            return Err(WorkerError::source_unavailable(format!(
                "Source video for '{}' not found",
                source_id
            )));
        }

        let music = match music {
            MusicReference::Library(name) => {
                if !is_safe_identifier(name) {
                    return Err(WorkerError::invalid_request(format!(
                        "Invalid music reference '{}'",
                        name
                    )));
                }
                let track = self.library_track(name);
                if !track.is_file() {
                    return Err(WorkerError::source_unavailable(format!(
                        "Music track '{}' not found",
                        name
                    )));
                }
                track
            }
            MusicReference::Uploaded(path) => {
                if !path.is_file() {
                    return Err(WorkerError::source_unavailable("Uploaded music file not found"));
                }
                path.clone()
            }
        };

        Ok(ResolvedSources {
            video,
            analysis_uri: self.analysis_uri(source_id),
            music,
        })
    }

    /// Whether `path` resolves to a location inside the output directory.
    ///
    /// Both sides are canonicalized, so symlinks and `..` components cannot
    /// escape. Paths that do not exist are rejected.
    pub fn is_within_output(&self, path: &Path) -> bool {
        match (self.output_dir.canonicalize(), path.canonicalize()) {
            (Ok(root), Ok(candidate)) => candidate.starts_with(root),
            _ => false,
        }
    }
}

/// Delete every file directly inside `dir`, creating the directory if needed.
///
/// Returns the number of files removed.
pub async fn purge_directory(dir: &Path) -> WorkerResult<usize> {
    tokio::fs::create_dir_all(dir).await?;

    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
