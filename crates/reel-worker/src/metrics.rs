//! Run lifecycle metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_SUBMITTED_TOTAL: &str = "reel_runs_submitted_total";
    pub const RUNS_REJECTED_TOTAL: &str = "reel_runs_rejected_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "reel_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "reel_runs_failed_total";

    pub const ANALYSIS_CACHE_HITS_TOTAL: &str = "reel_analysis_cache_hits_total";
    pub const ANALYSIS_CACHE_MISSES_TOTAL: &str = "reel_analysis_cache_misses_total";
    pub const ANALYSIS_FALLBACK_TOTAL: &str = "reel_analysis_fallback_total";

    pub const RENDER_DURATION_SECONDS: &str = "reel_render_duration_seconds";
}

pub fn record_run_submitted() {
    counter!(names::RUNS_SUBMITTED_TOTAL).increment(1);
}

/// Record a submission rejected before a run was created.
pub fn record_run_rejected(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::RUNS_REJECTED_TOTAL, &labels).increment(1);
}

pub fn record_run_completed() {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
}

pub fn record_run_failed() {
    counter!(names::RUNS_FAILED_TOTAL).increment(1);
}

pub fn record_cache_hit() {
    counter!(names::ANALYSIS_CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::ANALYSIS_CACHE_MISSES_TOTAL).increment(1);
}

/// Record an analysis payload replaced by the full-source clip.
pub fn record_analysis_fallback() {
    counter!(names::ANALYSIS_FALLBACK_TOTAL).increment(1);
}

pub fn record_render_duration(duration_secs: f64) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}
