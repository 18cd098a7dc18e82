//! Montage planning and FFmpeg rendering.
//!
//! This crate provides:
//! - Frame-grid time quantization
//! - Beat interval calculation
//! - Clip cursor allocation across a cyclic clip pool
//! - Deterministic filter graph construction
//! - FFmpeg command building, progress parsing and probing
//! - The `Renderer` seam with an FFmpeg implementation

pub mod allocator;
pub mod command;
pub mod error;
pub mod frame_grid;
pub mod graph;
pub mod intervals;
pub mod probe;
pub mod progress;
pub mod render;

pub use allocator::{allocate_segments, ClipAllocator, TIME_EPSILON};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame_grid::{FrameGrid, DEFAULT_FRAME_RATE};
pub use graph::{build_montage_graph, FilterChain, RenderGraph, DEFAULT_FADE_WINDOW};
pub use intervals::beat_intervals;
pub use probe::{probe_duration, DurationProbe, FfprobeDuration};
pub use progress::FfmpegProgress;
pub use render::{EncodingProfile, FfmpegRenderer, Renderer};
