//! Clip analysis.
//!
//! The analysis service watches the source video and answers with a JSON
//! array of key moments. Its answer is untrusted text: this module turns it
//! into a validated, never-empty clip pool, substituting a clip spanning the
//! whole source when nothing usable survives.

use async_trait::async_trait;
use reel_media::TIME_EPSILON;
use reel_models::{parse_timestamp, SourceClip};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::WorkerResult;

/// Input for one analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Reference the service can read the video from (e.g. a `gs://` URI)
    pub source_uri: String,
    /// Source duration in seconds, when known
    pub duration_hint: Option<f64>,
}

/// A service that identifies key moments in a video.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Return the raw response text.
    async fn analyze(&self, request: &AnalysisRequest) -> WorkerResult<String>;
}

/// Outcome of validating an analysis payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPool {
    pub clips: Vec<SourceClip>,
    /// Elements of the payload that were discarded
    pub dropped: usize,
    /// Whether `clips` is the full-source substitute
    pub fallback: bool,
}

/// Parse an analysis payload into a clip pool bounded by `source_duration`.
///
/// Elements need `start_timestamp` and `end_timestamp` as `HH:MM:SS`-style
/// strings or plain numbers. Elements that fail to parse, are shorter than
/// `min_clip_length` (or inverted), start before zero, or end past the
/// source are dropped. An unparseable payload or one with no surviving
/// elements yields a single clip covering `[0, source_duration]`.
pub fn parse_clip_pool(raw: &str, source_duration: f64, min_clip_length: f64) -> ClipPool {
    let elements = match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Array(elements)) => elements,
        Ok(other) => {
            warn!("Analysis payload is not an array (got {}), using full source", kind(&other));
            return ClipPool::fallback(source_duration, 0);
        }
        Err(e) => {
            warn!("Analysis payload is not valid JSON ({}), using full source", e);
            return ClipPool::fallback(source_duration, 0);
        }
    };

    // Never at or below the allocator's residue threshold
    let min_length = min_clip_length.max(2.0 * TIME_EPSILON);

    let total = elements.len();
    let clips: Vec<SourceClip> = elements
        .iter()
        .filter_map(|element| parse_clip(element, source_duration, min_length))
        .collect();
    let dropped = total - clips.len();

    if clips.is_empty() {
        warn!("No usable clips in analysis payload ({} elements), using full source", total);
        return ClipPool::fallback(source_duration, dropped);
    }
    if dropped > 0 {
        debug!("Dropped {} of {} analysis clips", dropped, total);
    }

    ClipPool {
        clips,
        dropped,
        fallback: false,
    }
}

impl ClipPool {
    fn fallback(source_duration: f64, dropped: usize) -> Self {
        Self {
            clips: vec![SourceClip::full_source(source_duration)],
            dropped,
            fallback: true,
        }
    }
}

fn parse_clip(element: &Value, source_duration: f64, min_length: f64) -> Option<SourceClip> {
    let start = timestamp_field(element, "start_timestamp")?;
    let end = timestamp_field(element, "end_timestamp")?;

    let valid = start >= 0.0 && end <= source_duration && end - start >= min_length;
    valid.then(|| SourceClip::new(start, end))
}

fn timestamp_field(element: &Value, field: &str) -> Option<f64> {
    match element.get(field)? {
        Value::String(s) => parse_timestamp(s).ok(),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Strip a surrounding markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One frame at 59.94 fps
    const FRAME: f64 = 1.0 / 59.94;

    #[test]
    fn test_parses_hms_timestamps() {
        let raw = r#"[
            {"start_timestamp": "00:00:05", "end_timestamp": "00:00:12", "description": "Home run"},
            {"start_timestamp": "00:01:30.5", "end_timestamp": "00:01:40", "description": "Catch"}
        ]"#;

        let pool = parse_clip_pool(raw, 300.0, FRAME);
        assert!(!pool.fallback);
        assert_eq!(pool.dropped, 0);
        assert_eq!(
            pool.clips,
            vec![SourceClip::new(5.0, 12.0), SourceClip::new(90.5, 100.0)]
        );
    }

    #[test]
    fn test_strips_code_fence() {
        let raw = "```json\n[{\"start_timestamp\": 1, \"end_timestamp\": 4}]\n```";
        let pool = parse_clip_pool(raw, 10.0, FRAME);
        assert_eq!(pool.clips, vec![SourceClip::new(1.0, 4.0)]);

        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  []  "), "[]");
    }

    #[test]
    fn test_invalid_payload_falls_back_to_full_source() {
        for raw in ["not json", "{\"clips\": []}", "[]", ""] {
            let pool = parse_clip_pool(raw, 42.0, FRAME);
            assert!(pool.fallback, "payload {:?}", raw);
            assert_eq!(pool.clips, vec![SourceClip::new(0.0, 42.0)]);
        }
    }

    #[test]
    fn test_drops_invalid_elements() {
        let raw = r#"[
            {"start_timestamp": "00:00:10", "end_timestamp": "00:00:05"},
            {"start_timestamp": "00:00:05", "end_timestamp": "00:00:05"},
            {"start_timestamp": "00:00:50", "end_timestamp": "00:01:10"},
            {"start_timestamp": "soon", "end_timestamp": "00:00:05"},
            {"end_timestamp": "00:00:05"},
            {"start_timestamp": -1, "end_timestamp": 3},
            "00:00:01",
            {"start_timestamp": "00:00:02", "end_timestamp": "00:00:03"}
        ]"#;

        let pool = parse_clip_pool(raw, 60.0, FRAME);
        assert!(!pool.fallback);
        assert_eq!(pool.dropped, 7);
        assert_eq!(pool.clips, vec![SourceClip::new(2.0, 3.0)]);
    }

    #[test]
    fn test_sub_frame_clips_dropped() {
        let raw = r#"[
            {"start_timestamp": 0, "end_timestamp": 0.00001},
            {"start_timestamp": 4, "end_timestamp": 4.01},
            {"start_timestamp": 10, "end_timestamp": 12}
        ]"#;

        let pool = parse_clip_pool(raw, 60.0, FRAME);
        assert_eq!(pool.dropped, 2);
        assert_eq!(pool.clips, vec![SourceClip::new(10.0, 12.0)]);

        // Only sub-frame clips: the full source stands in
        let raw = r#"[{"start_timestamp": 0, "end_timestamp": 0.00001}]"#;
        let pool = parse_clip_pool(raw, 60.0, FRAME);
        assert!(pool.fallback);
        assert_eq!(pool.clips, vec![SourceClip::full_source(60.0)]);
    }

    #[test]
    fn test_all_elements_invalid_falls_back() {
        let raw = r#"[{"start_timestamp": "00:02:00", "end_timestamp": "00:03:00"}]"#;
        let pool = parse_clip_pool(raw, 60.0, FRAME);
        assert!(pool.fallback);
        assert_eq!(pool.dropped, 1);
        assert_eq!(pool.clips, vec![SourceClip::full_source(60.0)]);
    }
}
