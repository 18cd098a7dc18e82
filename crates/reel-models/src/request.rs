//! Montage submission request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::Region;

/// A request to render a beat-synced montage.
///
/// Field aliases accept the payload shape emitted by the beat editor
/// (`gamePk`, `reelRegion`, `musicName`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MontageRequest {
    /// Source video identifier
    #[serde(alias = "gamePk")]
    #[validate(length(min = 1, max = 128), custom(function = "validate_identifier"))]
    pub source_id: String,

    /// Output window on the music timeline
    #[serde(alias = "reelRegion")]
    #[validate(custom(function = "validate_region"))]
    pub region: Region,

    /// Beat timestamps tapped by the user (unordered, may repeat)
    #[validate(length(max = 10000))]
    pub beat_markers: Vec<f64>,

    /// Name of a track in the music library
    #[serde(alias = "musicName")]
    #[validate(length(min = 1, max = 255), custom(function = "validate_identifier"))]
    pub music_reference: String,
}

/// Whether `value` is safe to splice into a file name under the assets directory.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && !value.contains("..")
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if is_safe_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError::new("unsafe_identifier"))
    }
}

fn validate_region(region: &Region) -> Result<(), ValidationError> {
    region.check().map_err(|e| {
        let mut err = ValidationError::new("invalid_region");
        err.message = Some(e.to_string().into());
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_json(source_id: &str, music: &str) -> String {
        format!(
            r#"{{"sourceId":"{source_id}","region":{{"start":0,"end":10}},"beatMarkers":[3,3,7],"musicReference":"{music}"}}"#
        )
    }

    #[test]
    fn test_valid_request() {
        let req: MontageRequest = serde_json::from_str(&request_json("748231", "anthem.mp3")).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.beat_markers, vec![3.0, 3.0, 7.0]);
    }

    #[test]
    fn test_editor_aliases() {
        let json = r#"{"gamePk":"748231","reelRegion":{"start":1,"end":4},"beatMarkers":[],"musicName":"track.mp3"}"#;
        let req: MontageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.source_id, "748231");
        assert_eq!(req.music_reference, "track.mp3");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let json = r#"{"sourceId":"1","region":{"start":0,"end":10},"musicReference":"a.mp3"}"#;
        assert!(serde_json::from_str::<MontageRequest>(json).is_err());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let req: MontageRequest = serde_json::from_str(&request_json("1", "../secret.mp3")).unwrap();
        assert!(req.validate().is_err());

        let req: MontageRequest = serde_json::from_str(&request_json("a/b", "ok.mp3")).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_inverted_region_rejected() {
        let json = r#"{"sourceId":"1","region":{"start":10,"end":2},"beatMarkers":[],"musicReference":"a.mp3"}"#;
        let req: MontageRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_beat_marker_limit() {
        let mut req: MontageRequest = serde_json::from_str(&request_json("1", "a.mp3")).unwrap();
        req.beat_markers = vec![1.0; 10_000];
        assert!(req.validate().is_ok());

        req.beat_markers.push(2.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_is_safe_identifier() {
        assert!(is_safe_identifier("source_748231-480p.mp4"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier(".hidden"));
        assert!(!is_safe_identifier("a..b"));
        assert!(!is_safe_identifier("dir\\file"));
    }
}
