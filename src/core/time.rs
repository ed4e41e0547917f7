/// Frame rate the timeline runs at. All frame arithmetic in the core
/// assumes this fixed rate; per-source frame rates only matter inside
/// the external tools.
pub const FRAME_RATE: i64 = 30;

/// Convert a timeline position in milliseconds to a frame index.
///
/// Uses floor so a position never reports ahead of where real elapsed
/// time places it; polling playback at ms granularity then stays on the
/// frame that has actually started.
pub fn ms_to_frames(ms: i64) -> i64 {
    (ms.max(0) * FRAME_RATE) / 1000
}

/// Convert a frame index to its canonical millisecond value: the first
/// integer millisecond inside the frame. This is the closest value to
/// the real frame boundary that still round-trips through
/// `ms_to_frames` for every index.
pub fn frames_to_ms(frame: i64) -> i64 {
    let frame = frame.max(0);
    (frame * 1000 + FRAME_RATE - 1) / FRAME_RATE
}

/// Snap an arbitrary timestamp down to its frame's canonical
/// millisecond value. Idempotent.
pub fn align_to_frame_boundary(ms: i64) -> i64 {
    frames_to_ms(ms_to_frames(ms))
}

/// Canonical millisecond value of the frame after the one containing
/// `ms`.
pub fn next_frame_boundary(ms: i64) -> i64 {
    frames_to_ms(ms_to_frames(ms) + 1)
}

/// Canonical millisecond value of the frame before the one containing
/// `ms`. Clamps at frame 0.
pub fn previous_frame_boundary(ms: i64) -> i64 {
    frames_to_ms((ms_to_frames(ms) - 1).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_frames_floors() {
        assert_eq!(ms_to_frames(0), 0);
        assert_eq!(ms_to_frames(33), 0);
        assert_eq!(ms_to_frames(34), 1);
        assert_eq!(ms_to_frames(1000), 30);
        assert_eq!(ms_to_frames(999), 29);
    }

    #[test]
    fn test_negative_input_treated_as_zero() {
        assert_eq!(ms_to_frames(-50), 0);
        assert_eq!(frames_to_ms(-3), 0);
        assert_eq!(align_to_frame_boundary(-1), 0);
    }

    #[test]
    fn test_frame_round_trip() {
        for frame in 0..2000 {
            assert_eq!(
                ms_to_frames(frames_to_ms(frame)),
                frame,
                "frame {} did not round-trip",
                frame
            );
        }
    }

    #[test]
    fn test_alignment_is_idempotent() {
        for ms in 0..5000 {
            let once = align_to_frame_boundary(ms);
            assert_eq!(align_to_frame_boundary(once), once, "ms {} not idempotent", ms);
        }
    }

    #[test]
    fn test_aligned_value_never_exceeds_input_frame() {
        // Alignment must stay within the same frame as the input.
        for ms in 0..5000 {
            assert_eq!(ms_to_frames(align_to_frame_boundary(ms)), ms_to_frames(ms));
        }
    }

    #[test]
    fn test_boundary_stepping() {
        let ms = 1000; // frame 30
        assert_eq!(ms_to_frames(next_frame_boundary(ms)), 31);
        assert_eq!(ms_to_frames(previous_frame_boundary(ms)), 29);
        // Previous boundary clamps at frame 0.
        assert_eq!(previous_frame_boundary(0), 0);
        assert_eq!(previous_frame_boundary(20), 0);
    }
}
