//! Montage rendering.
//!
//! The [`Renderer`] trait is the seam between the montage pipeline and the
//! encoder. [`FfmpegRenderer`] executes a [`RenderGraph`] with the FFmpeg CLI.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::graph::RenderGraph;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

/// Executes a render graph into an output file.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, graph: &RenderGraph, output: &Path) -> MediaResult<()>;
}

/// Renderer backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    encoding: EncodingProfile,
    timeout_secs: Option<u64>,
}

impl FfmpegRenderer {
    pub fn new(encoding: EncodingProfile) -> Self {
        Self {
            encoding,
            timeout_secs: None,
        }
    }

    /// Kill renders that run longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the FFmpeg invocation for a graph.
    pub fn build_command(&self, graph: &RenderGraph, output: &Path) -> FfmpegCommand {
        let cmd = graph
            .inputs
            .iter()
            .fold(FfmpegCommand::new(output), |cmd, input| cmd.input(input));

        cmd.filter_complex(graph.filter_complex())
            .map_pad(&graph.video_output)
            .map_pad(&graph.audio_output)
            .video_codec(&self.encoding.codec)
            .preset(&self.encoding.preset)
            .crf(self.encoding.crf)
            .audio_codec(&self.encoding.audio_codec)
            .audio_bitrate(&self.encoding.audio_bitrate)
            .movflags("+faststart")
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render(&self, graph: &RenderGraph, output: &Path) -> MediaResult<()> {
        for input in &graph.inputs {
            if !input.exists() {
                return Err(MediaError::FileNotFound(input.clone()));
            }
        }

        info!(
            "Rendering montage: {} segments, {:.2}s -> {}",
            graph.segment_count(),
            graph.duration,
            output.display()
        );

        let cmd = self.build_command(graph, output);
        let runner = match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        };

        let started = Instant::now();
        let total = graph.duration;
        runner
            .run_with_progress(&cmd, move |progress| {
                debug!("Render progress: {:.1}%", progress.percentage(total));
            })
            .await?;

        info!(
            "Montage rendered in {:.1}s: {}",
            started.elapsed().as_secs_f64(),
            output.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_montage_graph;
    use reel_models::{Region, Segment};

    #[test]
    fn test_build_command_maps_faded_streams() {
        let segments = [Segment {
            clip_index: 0,
            source_start: 4.0,
            duration: 6.0,
        }];
        let graph = build_montage_graph(
            &segments,
            Path::new("source.mp4"),
            Path::new("music.mp3"),
            &Region { start: 0.0, end: 6.0 },
            2.0,
        )
        .unwrap();

        let args = FfmpegRenderer::default()
            .build_command(&graph, Path::new("final_montage.mp4"))
            .build_args();

        let joined = args.join(" ");
        assert!(joined.contains("-i source.mp4 -i music.mp3"));
        assert!(joined.contains("-map [faded_v] -map [faded_a]"));
        assert!(joined.contains("-c:v libx264 -preset veryfast -crf 23"));
        assert!(joined.contains("-c:a aac -b:a 128k"));
        assert!(joined.contains("-movflags +faststart"));
        assert_eq!(args.last().unwrap(), "final_montage.mp4");
    }

    #[tokio::test]
    async fn test_render_missing_input() {
        let segments = [Segment {
            clip_index: 0,
            source_start: 0.0,
            duration: 1.0,
        }];
        let graph = build_montage_graph(
            &segments,
            Path::new("/missing/source.mp4"),
            Path::new("/missing/music.mp3"),
            &Region { start: 0.0, end: 1.0 },
            2.0,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegRenderer::default()
            .render(&graph, &dir.path().join("out.mp4"))
            .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
