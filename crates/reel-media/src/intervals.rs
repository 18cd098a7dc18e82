//! Beat interval calculation.
//!
//! Turns the user's beat markers into the ordered list of slot durations
//! that the montage timeline must fill, one slot per beat.

use reel_models::Region;

use crate::error::MediaResult;
use crate::frame_grid::FrameGrid;

/// Compute the slot durations between consecutive beats of a region.
///
/// The region is frame-aligned first. Markers outside the aligned region
/// (and non-finite markers) are dropped, the rest are sorted ascending.
/// Duplicate markers are kept and yield zero-length slots. A trailing slot
/// closes any gap between the last marker and the region end, so the
/// result always sums to the aligned region length.
pub fn beat_intervals(markers: &[f64], region: &Region, grid: &FrameGrid) -> MediaResult<Vec<f64>> {
    let aligned = grid.align_region(region)?;

    let mut beats: Vec<f64> = markers
        .iter()
        .copied()
        .filter(|beat| aligned.contains(*beat))
        .collect();
    beats.sort_by(f64::total_cmp);

    let mut intervals = Vec::with_capacity(beats.len() + 1);
    let mut previous = aligned.start;
    for beat in beats {
        intervals.push(beat - previous);
        previous = beat;
    }
    if previous < aligned.end {
        intervals.push(aligned.end - previous);
    }

    Ok(intervals)
}
