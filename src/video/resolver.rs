use std::collections::HashMap;

use crate::core::clip::{ClipInstance, MediaKind};
use crate::video::compositor::ClipLayout;

/// Per-clip screen placement supplied by the UI layer in layout mode,
/// keyed by persisted clip id.
pub type LayoutMap = HashMap<String, ClipLayout>;

/// Filter the clip set down to the clips that should contribute to the
/// composite at `query_ms`.
///
/// A clip qualifies when it is a video clip with a persisted id (and a
/// layout entry, when a layout is in play) whose half-open track
/// interval `[track_in, track_out)` contains the timestamp and whose
/// source file exists. Missing files are skipped with a warning, never
/// an error. Input order is preserved; layering is the layout's
/// concern, not the resolver's.
pub fn resolve_active_clips<'a>(
    clips: &'a [ClipInstance],
    query_ms: i64,
    layout: Option<&LayoutMap>,
) -> Vec<&'a ClipInstance> {
    let mut active = Vec::new();
    for clip in clips {
        if clip.kind != MediaKind::Video {
            continue;
        }
        let id = match clip.id.as_deref() {
            Some(id) => id,
            None => {
                log::debug!("Skipping unplaced clip '{}' with no id", clip.name);
                continue;
            }
        };
        if let Some(layout) = layout {
            if !layout.contains_key(id) {
                log::debug!("Skipping clip '{}' with no layout entry", clip.name);
                continue;
            }
        }
        if !clip.is_active_at(query_ms) {
            continue;
        }
        if !clip.source_path.exists() {
            log::warn!(
                "Skipping clip '{}': source file not found: {}",
                clip.name,
                clip.source_path.display()
            );
            continue;
        }
        active.push(clip);
    }
    log::debug!(
        "{} of {} clips active at {}ms",
        active.len(),
        clips.len(),
        query_ms
    );
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::compositor::LayoutRect;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn temp_media_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("flipedit-resolver-tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        fs::write(&path, b"stub").unwrap();
        path
    }

    fn clip(path: &std::path::Path, track_start: i64, track_end: i64) -> ClipInstance {
        ClipInstance::new(
            1,
            "clip",
            MediaKind::Video,
            path,
            600_000,
            0,
            600_000,
            track_start,
            track_end,
        )
        .unwrap()
    }

    fn layout_entry() -> ClipLayout {
        ClipLayout {
            rect: LayoutRect {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            },
            flip_h: false,
            flip_v: false,
        }
    }

    #[test]
    fn test_half_open_interval_boundaries() {
        let path = temp_media_file("a.mp4");
        let clips = [clip(&path, 1000, 2000)];
        assert_eq!(resolve_active_clips(&clips, 1999, None).len(), 1);
        assert_eq!(resolve_active_clips(&clips, 2000, None).len(), 0);
        assert_eq!(resolve_active_clips(&clips, 1000, None).len(), 1);
        assert_eq!(resolve_active_clips(&clips, 999, None).len(), 0);
    }

    #[test]
    fn test_missing_file_is_skipped_not_fatal() {
        let existing = temp_media_file("b.mp4");
        let clips = [
            clip(Path::new("/definitely/not/here.mp4"), 0, 5000),
            clip(&existing, 0, 5000),
        ];
        let active = resolve_active_clips(&clips, 2000, None);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source_path, existing);
    }

    #[test]
    fn test_non_video_clips_are_ignored() {
        let path = temp_media_file("c.mp4");
        let mut audio = clip(&path, 0, 5000);
        audio.kind = MediaKind::Audio;
        let clips = [audio, clip(&path, 0, 5000)];
        assert_eq!(resolve_active_clips(&clips, 100, None).len(), 1);
    }

    #[test]
    fn test_clip_without_id_is_ignored() {
        let path = temp_media_file("d.mp4");
        let mut ghost = clip(&path, 0, 5000);
        ghost.id = None;
        let clips = [ghost, clip(&path, 0, 5000)];
        assert_eq!(resolve_active_clips(&clips, 100, None).len(), 1);
    }

    #[test]
    fn test_layout_mode_requires_an_entry() {
        let path = temp_media_file("e.mp4");
        let with_layout = clip(&path, 0, 5000);
        let without_layout = clip(&path, 0, 5000);

        let mut layout = LayoutMap::new();
        layout.insert(with_layout.id.clone().unwrap(), layout_entry());

        let clips = [with_layout.clone(), without_layout];
        let active = resolve_active_clips(&clips, 100, Some(&layout));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, with_layout.id);
    }

    #[test]
    fn test_input_order_is_preserved() {
        let first = temp_media_file("f1.mp4");
        let second = temp_media_file("f2.mp4");
        let clips = [clip(&first, 0, 5000), clip(&second, 0, 5000)];
        let active = resolve_active_clips(&clips, 100, None);
        assert_eq!(active[0].source_path, first);
        assert_eq!(active[1].source_path, second);
    }
}
