use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
    Image,
    Text,
    Effect,
}

/// Screen-space placement a clip requests for itself in the preview,
/// in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Free-form clip metadata. The preview transform fields are the only
/// ones the core interprets; everything else is carried through
/// untouched for the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    #[serde(rename = "previewRect", default, skip_serializing_if = "Option::is_none")]
    pub preview_rect: Option<PreviewRect>,
    /// 0 = none, 1 = horizontal, 2 = vertical.
    #[serde(rename = "previewFlip", default, skip_serializing_if = "Option::is_none")]
    pub preview_flip: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClipMetadata {
    pub fn flip_horizontal(&self) -> bool {
        self.preview_flip == Some(1)
    }

    pub fn flip_vertical(&self) -> bool {
        self.preview_flip == Some(2)
    }
}

/// Raised when clip time bounds are invalid after auto-correction.
/// Carries every violated rule, not just the first.
#[derive(Debug, Error)]
#[error("invalid clip times: {}", violations.join("; "))]
pub struct ClipValidationError {
    pub violations: Vec<String>,
}

/// A clip placed on a timeline track.
///
/// Source times index into the clip's media file; track times place the
/// clip on the shared timeline. Instances are never mutated in place:
/// moves and trims produce new validated copies.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInstance {
    /// Persisted id; `None` for clips that have not been committed yet.
    pub id: Option<String>,
    pub track_id: i64,
    pub name: String,
    pub kind: MediaKind,
    pub source_path: PathBuf,
    pub source_duration_ms: i64,
    pub start_in_source_ms: i64,
    pub end_in_source_ms: i64,
    pub start_on_track_ms: i64,
    pub end_on_track_ms: i64,
    pub metadata: ClipMetadata,
}

/// Validate the four time bounds against the source duration.
///
/// Inverted pairs (end before start) are auto-corrected by swapping
/// before the checks run. Returns the corrected
/// `(source_start, source_end, track_start, track_end)` tuple.
pub fn validate_clip_times(
    source_start_ms: i64,
    source_end_ms: i64,
    track_start_ms: i64,
    track_end_ms: i64,
    source_duration_ms: i64,
) -> Result<(i64, i64, i64, i64), ClipValidationError> {
    let (source_start_ms, source_end_ms) = if source_end_ms < source_start_ms {
        log::debug!(
            "auto-correcting inverted source range {}..{}",
            source_start_ms,
            source_end_ms
        );
        (source_end_ms, source_start_ms)
    } else {
        (source_start_ms, source_end_ms)
    };
    let (track_start_ms, track_end_ms) = if track_end_ms < track_start_ms {
        log::debug!(
            "auto-correcting inverted track range {}..{}",
            track_start_ms,
            track_end_ms
        );
        (track_end_ms, track_start_ms)
    } else {
        (track_start_ms, track_end_ms)
    };

    let mut violations = Vec::new();
    if source_end_ms < source_start_ms {
        violations.push(format!(
            "source end {}ms is before source start {}ms",
            source_end_ms, source_start_ms
        ));
    }
    if track_end_ms < track_start_ms {
        violations.push(format!(
            "track end {}ms is before track start {}ms",
            track_end_ms, track_start_ms
        ));
    }
    if source_end_ms > source_duration_ms {
        violations.push(format!(
            "source end {}ms exceeds duration {}ms",
            source_end_ms, source_duration_ms
        ));
    }
    if source_start_ms < 0 {
        violations.push(format!("source start {}ms is negative", source_start_ms));
    }

    if violations.is_empty() {
        Ok((source_start_ms, source_end_ms, track_start_ms, track_end_ms))
    } else {
        Err(ClipValidationError { violations })
    }
}

/// Non-throwing probe for callers that want to pre-check bounds.
pub fn is_valid_clip(
    source_start_ms: i64,
    source_end_ms: i64,
    track_start_ms: i64,
    track_end_ms: i64,
    source_duration_ms: i64,
) -> bool {
    validate_clip_times(
        source_start_ms,
        source_end_ms,
        track_start_ms,
        track_end_ms,
        source_duration_ms,
    )
    .is_ok()
}

impl ClipInstance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        track_id: i64,
        name: impl Into<String>,
        kind: MediaKind,
        source_path: impl Into<PathBuf>,
        source_duration_ms: i64,
        start_in_source_ms: i64,
        end_in_source_ms: i64,
        start_on_track_ms: i64,
        end_on_track_ms: i64,
    ) -> Result<Self, ClipValidationError> {
        let (start_in_source_ms, end_in_source_ms, start_on_track_ms, end_on_track_ms) =
            validate_clip_times(
                start_in_source_ms,
                end_in_source_ms,
                start_on_track_ms,
                end_on_track_ms,
                source_duration_ms,
            )?;

        Ok(ClipInstance {
            id: Some(uuid::Uuid::new_v4().to_string()),
            track_id,
            name: name.into(),
            kind,
            source_path: source_path.into(),
            source_duration_ms,
            start_in_source_ms,
            end_in_source_ms,
            start_on_track_ms,
            end_on_track_ms,
            metadata: ClipMetadata::default(),
        })
    }

    pub fn duration_in_source_ms(&self) -> i64 {
        self.end_in_source_ms - self.start_in_source_ms
    }

    pub fn duration_on_track_ms(&self) -> i64 {
        self.end_on_track_ms - self.start_on_track_ms
    }

    pub fn duration_in_source_frames(&self) -> i64 {
        time::ms_to_frames(self.duration_in_source_ms())
    }

    pub fn duration_on_track_frames(&self) -> i64 {
        time::ms_to_frames(self.duration_on_track_ms())
    }

    pub fn start_on_track_frame(&self) -> i64 {
        time::ms_to_frames(self.start_on_track_ms)
    }

    pub fn end_on_track_frame(&self) -> i64 {
        time::ms_to_frames(self.end_on_track_ms)
    }

    /// Whether the clip's track interval contains the timestamp.
    /// Half-open: a clip is never active at its own end boundary, so two
    /// adjacent clips cannot both claim it.
    pub fn is_active_at(&self, track_ms: i64) -> bool {
        self.start_on_track_ms <= track_ms && track_ms < self.end_on_track_ms
    }

    /// Map a timeline position to the corresponding offset inside the
    /// source file, clamped into the clip's declared source window.
    pub fn source_position_for(&self, track_ms: i64) -> i64 {
        let into_clip = (track_ms - self.start_on_track_ms).max(0);
        (self.start_in_source_ms + into_clip).clamp(self.start_in_source_ms, self.end_in_source_ms)
    }

    /// Copy-producing move to a new track position, keeping the track
    /// duration.
    pub fn moved_to(&self, start_on_track_ms: i64) -> Result<Self, ClipValidationError> {
        let duration = self.duration_on_track_ms();
        let (start_in_source_ms, end_in_source_ms, start_on_track_ms, end_on_track_ms) =
            validate_clip_times(
                self.start_in_source_ms,
                self.end_in_source_ms,
                start_on_track_ms,
                start_on_track_ms + duration,
                self.source_duration_ms,
            )?;
        Ok(ClipInstance {
            start_in_source_ms,
            end_in_source_ms,
            start_on_track_ms,
            end_on_track_ms,
            ..self.clone()
        })
    }

    /// Copy-producing trim of the source window.
    pub fn trimmed(
        &self,
        start_in_source_ms: i64,
        end_in_source_ms: i64,
    ) -> Result<Self, ClipValidationError> {
        let (start_in_source_ms, end_in_source_ms, start_on_track_ms, end_on_track_ms) =
            validate_clip_times(
                start_in_source_ms,
                end_in_source_ms,
                self.start_on_track_ms,
                self.end_on_track_ms,
                self.source_duration_ms,
            )?;
        Ok(ClipInstance {
            start_in_source_ms,
            end_in_source_ms,
            start_on_track_ms,
            end_on_track_ms,
            ..self.clone()
        })
    }

    /// Build a clip from a storage record, silently repairing bounds.
    /// Externally-edited or legacy records may violate the invariants;
    /// loading clamps instead of failing.
    pub fn from_record(record: &ClipRecord) -> Self {
        let (mut source_start, mut source_end) =
            (record.start_time_in_source_ms, record.end_time_in_source_ms);
        if source_end < source_start {
            std::mem::swap(&mut source_start, &mut source_end);
        }
        let (mut track_start, mut track_end) =
            (record.start_time_on_track_ms, record.end_time_on_track_ms);
        if track_end < track_start {
            std::mem::swap(&mut track_start, &mut track_end);
        }
        source_start = source_start.max(0);
        let upper = record.source_duration_ms.max(source_start);
        source_end = source_end.clamp(source_start, upper);

        ClipInstance {
            id: record.clip_id.clone(),
            track_id: record.track_id,
            name: record.name.clone(),
            kind: record.kind,
            source_path: PathBuf::from(&record.source_path),
            source_duration_ms: record.source_duration_ms,
            start_in_source_ms: source_start,
            end_in_source_ms: source_end,
            start_on_track_ms: track_start,
            end_on_track_ms: track_end,
            metadata: record.metadata.clone(),
        }
    }

    /// Convert to a storage record, clamping the source end defensively
    /// on the way out as well.
    pub fn to_record(&self) -> ClipRecord {
        let upper = self.source_duration_ms.max(self.start_in_source_ms);
        ClipRecord {
            clip_id: self.id.clone(),
            track_id: self.track_id,
            name: self.name.clone(),
            kind: self.kind,
            source_path: self.source_path.to_string_lossy().into_owned(),
            source_duration_ms: self.source_duration_ms,
            start_time_in_source_ms: self.start_in_source_ms,
            end_time_in_source_ms: self.end_in_source_ms.clamp(self.start_in_source_ms, upper),
            start_time_on_track_ms: self.start_on_track_ms,
            end_time_on_track_ms: self.end_on_track_ms,
            metadata: self.metadata.clone(),
        }
    }
}

/// Wire/storage form of a clip, matching the persistence layer's keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<String>,
    #[serde(default)]
    pub track_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub source_duration_ms: i64,
    #[serde(default)]
    pub start_time_in_source_ms: i64,
    #[serde(default)]
    pub end_time_in_source_ms: i64,
    #[serde(default)]
    pub start_time_on_track_ms: i64,
    #[serde(default)]
    pub end_time_on_track_ms: i64,
    #[serde(default)]
    pub metadata: ClipMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_clip(
        source_start: i64,
        source_end: i64,
        track_start: i64,
        track_end: i64,
    ) -> Result<ClipInstance, ClipValidationError> {
        ClipInstance::new(
            1,
            "clip",
            MediaKind::Video,
            "a.mp4",
            10_000,
            source_start,
            source_end,
            track_start,
            track_end,
        )
    }

    #[test]
    fn test_valid_clip_construction() {
        let clip = video_clip(0, 5000, 1000, 6000).unwrap();
        assert!(clip.id.is_some());
        assert_eq!(clip.duration_in_source_ms(), 5000);
        assert_eq!(clip.duration_on_track_ms(), 5000);
    }

    #[test]
    fn test_inverted_track_range_is_swapped_not_rejected() {
        let clip = video_clip(0, 5000, 500, 100).unwrap();
        assert_eq!(clip.start_on_track_ms, 100);
        assert_eq!(clip.end_on_track_ms, 500);
    }

    #[test]
    fn test_inverted_source_range_is_swapped() {
        let clip = video_clip(4000, 1000, 0, 3000).unwrap();
        assert_eq!(clip.start_in_source_ms, 1000);
        assert_eq!(clip.end_in_source_ms, 4000);
    }

    #[test]
    fn test_source_end_past_duration_is_rejected() {
        let err = ClipInstance::new(
            1,
            "clip",
            MediaKind::Video,
            "a.mp4",
            1000,
            0,
            1500,
            0,
            1500,
        )
        .unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("exceeds duration")));
    }

    #[test]
    fn test_all_violations_are_collected() {
        let err = validate_clip_times(-100, 1500, 0, 500, 1000).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.iter().any(|v| v.contains("exceeds duration")));
        assert!(err.violations.iter().any(|v| v.contains("negative")));
    }

    #[test]
    fn test_is_valid_clip_probe() {
        assert!(is_valid_clip(0, 500, 0, 500, 1000));
        assert!(!is_valid_clip(0, 1500, 0, 500, 1000));
        // Inverted pairs are corrected before checking.
        assert!(is_valid_clip(500, 0, 500, 0, 1000));
    }

    #[test]
    fn test_half_open_activity_interval() {
        let clip = video_clip(0, 5000, 1000, 2000).unwrap();
        assert!(clip.is_active_at(1000));
        assert!(clip.is_active_at(1999));
        assert!(!clip.is_active_at(2000));
        assert!(!clip.is_active_at(999));
    }

    #[test]
    fn test_source_position_mapping() {
        let clip = video_clip(500, 4000, 1000, 4500).unwrap();
        assert_eq!(clip.source_position_for(1000), 500);
        assert_eq!(clip.source_position_for(2000), 1500);
        // Before the clip's start: clamped to the window start.
        assert_eq!(clip.source_position_for(0), 500);
        // Far past the end: clamped to the window end.
        assert_eq!(clip.source_position_for(100_000), 4000);
    }

    #[test]
    fn test_moved_clip_keeps_duration() {
        let clip = video_clip(0, 5000, 1000, 6000).unwrap();
        let moved = clip.moved_to(2500).unwrap();
        assert_eq!(moved.start_on_track_ms, 2500);
        assert_eq!(moved.duration_on_track_ms(), clip.duration_on_track_ms());
        // Original is untouched.
        assert_eq!(clip.start_on_track_ms, 1000);
    }

    #[test]
    fn test_trim_rejects_out_of_range_window() {
        let clip = video_clip(0, 5000, 0, 5000).unwrap();
        assert!(clip.trimmed(1000, 3000).is_ok());
        assert!(clip.trimmed(1000, 20_000).is_err());
    }

    #[test]
    fn test_record_load_repairs_bad_bounds() {
        let record = ClipRecord {
            clip_id: Some("c1".to_string()),
            track_id: 2,
            name: "legacy".to_string(),
            kind: MediaKind::Video,
            source_path: "b.mp4".to_string(),
            source_duration_ms: 1000,
            start_time_in_source_ms: -200,
            end_time_in_source_ms: 4000,
            start_time_on_track_ms: 900,
            end_time_on_track_ms: 100,
            metadata: ClipMetadata::default(),
        };
        let clip = ClipInstance::from_record(&record);
        assert_eq!(clip.start_in_source_ms, 0);
        assert_eq!(clip.end_in_source_ms, 1000);
        assert_eq!(clip.start_on_track_ms, 100);
        assert_eq!(clip.end_on_track_ms, 900);
    }

    #[test]
    fn test_record_round_trip() {
        let clip = video_clip(100, 900, 0, 800).unwrap();
        let restored = ClipInstance::from_record(&clip.to_record());
        assert_eq!(restored.start_in_source_ms, clip.start_in_source_ms);
        assert_eq!(restored.end_in_source_ms, clip.end_in_source_ms);
        assert_eq!(restored.id, clip.id);
    }

    #[test]
    fn test_record_json_keys_match_contract() {
        let clip = video_clip(0, 500, 0, 500).unwrap();
        let json = serde_json::to_value(clip.to_record()).unwrap();
        assert!(json.get("sourcePath").is_some());
        assert!(json.get("startTimeInSourceMs").is_some());
        assert!(json.get("endTimeOnTrackMs").is_some());
        assert_eq!(json.get("type").unwrap(), "video");
    }

    #[test]
    fn test_metadata_flip_helpers() {
        let mut metadata = ClipMetadata::default();
        assert!(!metadata.flip_horizontal());
        metadata.preview_flip = Some(1);
        assert!(metadata.flip_horizontal());
        metadata.preview_flip = Some(2);
        assert!(metadata.flip_vertical());
    }
}
