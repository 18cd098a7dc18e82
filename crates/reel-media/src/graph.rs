//! Montage filter graph construction.
//!
//! The graph is plain data: an ordered list of filter chains over two
//! inputs (source video, music bed). It renders to FFmpeg
//! `-filter_complex` syntax and is fully deterministic, so it can be
//! inspected and tested without running FFmpeg.

use std::fmt;
use std::path::{Path, PathBuf};

use reel_models::{Region, Segment};

use crate::error::{MediaError, MediaResult};

/// Input index of the source video.
pub const SOURCE_INPUT: usize = 0;
/// Input index of the music bed.
pub const MUSIC_INPUT: usize = 1;

/// Default length of the closing fade to black and silence.
pub const DEFAULT_FADE_WINDOW: f64 = 2.0;

const MONTAGE_VIDEO: &str = "montage_v";
const MONTAGE_AUDIO: &str = "montage_a";
const FADED_VIDEO: &str = "faded_v";
const FADED_AUDIO: &str = "faded_a";

/// One filter chain: `[in1][in2]filter1,filter2[out]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<String>,
    pub output: String,
}

impl FilterChain {
    fn new(inputs: Vec<String>, filters: Vec<String>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            filters,
            output: output.into(),
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{}]", input)?;
        }
        write!(f, "{}[{}]", self.filters.join(","), self.output)
    }
}

/// Declarative description of a montage render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraph {
    /// Input files, indexed by `SOURCE_INPUT` and `MUSIC_INPUT`
    pub inputs: Vec<PathBuf>,
    /// Filter chains in evaluation order
    pub chains: Vec<FilterChain>,
    /// Output pad carrying the final video
    pub video_output: String,
    /// Output pad carrying the final audio
    pub audio_output: String,
    /// Montage length in seconds
    pub duration: f64,
    /// Where the closing fade begins
    pub fade_start: f64,
}

impl RenderGraph {
    /// Render the chains as an FFmpeg `-filter_complex` argument.
    pub fn filter_complex(&self) -> String {
        self.chains
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Number of trimmed source segments in the graph.
    pub fn segment_count(&self) -> usize {
        self.chains.len().saturating_sub(4)
    }
}

/// Build the render graph for a planned montage.
///
/// Every segment becomes a `trim` of the source video reset to a zero time
/// origin; the trims are concatenated video-only. The music bed is trimmed
/// to the region, and both streams fade out over the last `fade_window`
/// seconds.
pub fn build_montage_graph(
    segments: &[Segment],
    source: &Path,
    music: &Path,
    region: &Region,
    fade_window: f64,
) -> MediaResult<RenderGraph> {
    if segments.is_empty() {
        return Err(MediaError::EmptyPlan);
    }

    let duration: f64 = segments.iter().map(|s| s.duration).sum();
    let fade_start = (duration - fade_window).max(0.0);
    let fade_length = duration - fade_start;

    let mut chains = Vec::with_capacity(segments.len() + 4);
    let mut labels = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let label = format!("mv{}", i);
        chains.push(FilterChain::new(
            vec![format!("{}:v", SOURCE_INPUT)],
            vec![
                format!("trim=start={}:duration={}", segment.source_start, segment.duration),
                "setpts=PTS-STARTPTS".to_string(),
            ],
            label.clone(),
        ));
        labels.push(label);
    }

    chains.push(FilterChain::new(
        labels,
        vec![format!("concat=n={}:v=1:a=0", segments.len())],
        MONTAGE_VIDEO,
    ));

    chains.push(FilterChain::new(
        vec![format!("{}:a", MUSIC_INPUT)],
        vec![
            format!("atrim=start={}:duration={}", region.start, region.duration()),
            "asetpts=PTS-STARTPTS".to_string(),
        ],
        MONTAGE_AUDIO,
    ));

    chains.push(FilterChain::new(
        vec![MONTAGE_VIDEO.to_string()],
        vec![format!("fade=t=out:st={}:d={}", fade_start, fade_length)],
        FADED_VIDEO,
    ));

    chains.push(FilterChain::new(
        vec![MONTAGE_AUDIO.to_string()],
        vec![format!("afade=t=out:st={}:d={}", fade_start, fade_length)],
        FADED_AUDIO,
    ));

    Ok(RenderGraph {
        inputs: vec![source.to_path_buf(), music.to_path_buf()],
        chains,
        video_output: FADED_VIDEO.to_string(),
        audio_output: FADED_AUDIO.to_string(),
        duration,
        fade_start,
    })
}
