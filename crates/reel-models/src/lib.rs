//! Shared data models for the montage engine.
//!
//! This crate provides Serde-serializable types for:
//! - Montage regions, source clips and planned segments
//! - Music bed references
//! - Montage runs and their lifecycle status
//! - Submission requests and their validation
//! - Timestamp parsing for analysis payloads

pub mod clip;
pub mod music;
pub mod region;
pub mod request;
pub mod run;
pub mod timestamp;

// Re-export common types
pub use clip::{Segment, SourceClip};
pub use music::MusicReference;
pub use region::{Region, RegionError};
pub use request::{is_safe_identifier, MontageRequest};
pub use run::{Run, RunId, RunStatus};
pub use timestamp::{parse_timestamp, TimestampError};
