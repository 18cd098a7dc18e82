//! Montage output window.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time window of the source timeline covered by a montage, in seconds.
///
/// Regions received from clients are raw; they become frame-aligned once
/// they pass through the frame grid in `reel-media`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

/// Region validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    #[error("Region bounds must be finite numbers")]
    NotFinite,

    #[error("Region start cannot be negative")]
    Negative,

    #[error("Region start ({start}) must be before end ({end})")]
    Empty { start: f64, end: f64 },
}

impl Region {
    /// Create a validated region.
    pub fn new(start: f64, end: f64) -> Result<Self, RegionError> {
        let region = Self { start, end };
        region.check()?;
        Ok(region)
    }

    /// Check the region invariants without consuming it.
    pub fn check(&self) -> Result<(), RegionError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(RegionError::NotFinite);
        }
        if self.start < 0.0 {
            return Err(RegionError::Negative);
        }
        if self.start >= self.end {
            return Err(RegionError::Empty {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Length of the region in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` falls inside the closed interval `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}
