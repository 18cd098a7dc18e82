//! Clip cursor allocation.
//!
//! Tiles the beat slots of a montage across a pool of source clips. Each
//! clip keeps a read cursor that advances as footage is consumed and wraps
//! back to the clip's own start once exhausted, so a short pool can fill an
//! arbitrarily long montage. A single round-robin pointer moves to the next
//! clip after every emitted segment.

use reel_models::{Segment, SourceClip};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Residue below this is treated as zero.
///
/// Guards against floating point leftovers producing sub-nanosecond
/// segments that no renderer can represent.
pub const TIME_EPSILON: f64 = 1e-9;

/// Read position within one pool clip.
#[derive(Debug, Clone, Copy)]
struct ClipCursor {
    original_start: f64,
    position: f64,
    end: f64,
}

impl ClipCursor {
    fn new(clip: &SourceClip) -> Self {
        Self {
            original_start: clip.start,
            position: clip.start,
            end: clip.end,
        }
    }

    fn available(&self) -> f64 {
        self.end - self.position
    }

    /// Footage left under the cursor, rewinding first if the clip is spent.
    fn available_or_rewind(&mut self) -> f64 {
        if self.available() <= TIME_EPSILON {
            self.position = self.original_start;
        }
        self.available()
    }
}

/// Allocation state for one montage.
///
/// Cursors and the round-robin pointer persist across intervals; they are
/// only rewound per clip on exhaustion.
#[derive(Debug)]
pub struct ClipAllocator {
    cursors: Vec<ClipCursor>,
    clip_index: usize,
}

impl ClipAllocator {
    /// Create an allocator over a clip pool.
    ///
    /// Every clip must be finite and longer than `TIME_EPSILON`; a shorter
    /// clip would wrap forever without consuming the interval.
    pub fn new(pool: &[SourceClip]) -> MediaResult<Self> {
        if pool.is_empty() {
            return Err(MediaError::EmptyClipPool);
        }
        if let Some((index, clip)) = pool.iter().enumerate().find(|(_, clip)| !is_usable(clip)) {
            return Err(MediaError::InvalidClip {
                index,
                start: clip.start,
                end: clip.end,
            });
        }
        Ok(Self {
            cursors: pool.iter().map(ClipCursor::new).collect(),
            clip_index: 0,
        })
    }

    /// Fill one interval, appending the emitted segments to `out`.
    ///
    /// Zero-length intervals emit nothing. A clip shorter than the interval
    /// wraps around as many times as needed.
    pub fn fill_interval(&mut self, interval: f64, out: &mut Vec<Segment>) {
        let mut remaining = interval;

        while remaining > TIME_EPSILON {
            let slot = self.clip_index % self.cursors.len();
            let cursor = &mut self.cursors[slot];

            let available = cursor.available_or_rewind();
            let duration = remaining.min(available);

            out.push(Segment {
                clip_index: slot,
                source_start: cursor.position,
                duration,
            });

            cursor.position += duration;
            remaining -= duration;
            self.clip_index += 1;
        }
    }
}

fn is_usable(clip: &SourceClip) -> bool {
    clip.start.is_finite() && clip.end.is_finite() && clip.duration() > TIME_EPSILON
}

/// Plan the segments that fill `intervals` from `pool`, in output order.
pub fn allocate_segments(intervals: &[f64], pool: &[SourceClip]) -> MediaResult<Vec<Segment>> {
    let mut allocator = ClipAllocator::new(pool)?;
    let mut segments = Vec::with_capacity(intervals.len());

    for interval in intervals {
        allocator.fill_interval(*interval, &mut segments);
    }

    debug!(
        "Allocated {} segments for {} intervals across {} clips",
        segments.len(),
        intervals.len(),
        pool.len()
    );

    Ok(segments)
}
