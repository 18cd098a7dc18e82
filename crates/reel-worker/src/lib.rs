//! Montage worker.
//!
//! This crate provides:
//! - The run lifecycle manager and its in-memory run table
//! - The background montage pipeline
//! - Clip analysis through Gemini, with a TTL response cache
//! - Keyed deferred tasks for cleanup and eviction
//! - Source and music resolution under the assets directory

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod manager;
pub mod metrics;
mod pipeline;
pub mod scheduler;
pub mod sources;
pub mod store;

pub use analysis::{parse_clip_pool, AnalysisProvider, AnalysisRequest, ClipPool};
pub use cache::AnalysisCache;
pub use config::{GeminiConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use gemini::GeminiClient;
pub use logging::RunLogger;
pub use manager::{MontageBackends, MontageManager};
pub use scheduler::DelayScheduler;
pub use sources::{purge_directory, SourceLayout};
pub use store::RunStore;
