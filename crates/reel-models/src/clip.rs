//! Source clips and planned output segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A range of footage in the source video, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceClip {
    pub start: f64,
    pub end: f64,
}

impl SourceClip {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Clip spanning the whole source, used when analysis yields nothing usable.
    pub fn full_source(source_duration: f64) -> Self {
        Self {
            start: 0.0,
            end: source_duration,
        }
    }

    /// Length of the clip in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One trimmed piece of source footage placed on the output timeline.
///
/// Segments are emitted in output order; concatenating them fills every
/// beat interval of the montage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Index of the pool clip this segment was cut from
    pub clip_index: usize,
    /// Position in the source video where the segment starts
    pub source_start: f64,
    /// Segment length in seconds
    pub duration: f64,
}

impl Segment {
    /// Source position where the segment ends.
    pub fn source_end(&self) -> f64 {
        self.source_start + self.duration
    }
}
