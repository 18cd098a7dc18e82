//! Frame-boundary time quantization.

use reel_models::Region;

use crate::error::{MediaError, MediaResult};

/// NTSC 60p, the frame rate of the 480p source renditions.
pub const DEFAULT_FRAME_RATE: f64 = 59.94;

/// Snaps timestamps to the nearest frame boundary of a fixed frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGrid {
    frame_rate: f64,
}

impl FrameGrid {
    /// Create a grid for `frame_rate` frames per second.
    pub fn new(frame_rate: f64) -> MediaResult<Self> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(MediaError::InvalidFrameRate(frame_rate));
        }
        Ok(Self { frame_rate })
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate
    }

    /// Align `t` to the nearest frame boundary.
    ///
    /// Computed as `round(t * fps) / fps`, which equals
    /// `round(t / frame) * frame` but keeps whole-second values exact for
    /// integral frame rates.
    pub fn align(&self, t: f64) -> f64 {
        (t * self.frame_rate).round() / self.frame_rate
    }

    /// Align both ends of a region.
    ///
    /// Fails if alignment collapses the region (shorter than half a frame).
    pub fn align_region(&self, region: &Region) -> MediaResult<Region> {
        Ok(Region::new(self.align(region.start), self.align(region.end))?)
    }
}

impl Default for FrameGrid {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}
