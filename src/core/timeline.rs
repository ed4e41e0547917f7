use crate::core::clip::{ClipInstance, ClipRecord};
use crate::core::time;

/// Timeline length used when no clips are loaded.
pub const DEFAULT_TOTAL_FRAMES: i64 = 600;

/// Current timeline contents as reported by the persistence/UI layer:
/// the clip list, the canvas the preview renders into, and the derived
/// total length in frames.
#[derive(Debug)]
pub struct TimelineState {
    clips: Vec<ClipInstance>,
    canvas_width: u32,
    canvas_height: u32,
    total_frames: i64,
}

impl TimelineState {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        TimelineState {
            clips: Vec::new(),
            canvas_width,
            canvas_height,
            total_frames: DEFAULT_TOTAL_FRAMES,
        }
    }

    pub fn clips(&self) -> &[ClipInstance] {
        &self.clips
    }

    pub fn total_frames(&self) -> i64 {
        self.total_frames
    }

    pub fn canvas_dimensions(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// Update the canvas dimensions. Returns whether they changed;
    /// non-positive dimensions are rejected.
    pub fn update_canvas_dimensions(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::warn!("Invalid canvas dimensions: {}x{}", width, height);
            return false;
        }
        if self.canvas_width == width && self.canvas_height == height {
            return false;
        }
        log::info!("Updating canvas dimensions to {}x{}", width, height);
        self.canvas_width = width;
        self.canvas_height = height;
        true
    }

    /// Replace the clip list from a batch of storage records.
    ///
    /// Records with an empty or missing source file are skipped with a
    /// warning, never an error. The timeline length grows to cover the
    /// furthest clip end and resets to the default when the list
    /// empties. Returns how many clips were accepted.
    pub fn apply_records(&mut self, records: &[ClipRecord]) -> usize {
        let old_count = self.clips.len();
        self.clips.clear();
        log::debug!("Cleared {} old clip entries", old_count);

        if records.is_empty() {
            log::info!("Received empty clip data - clearing timeline");
            self.total_frames = DEFAULT_TOTAL_FRAMES;
            return 0;
        }

        self.total_frames = DEFAULT_TOTAL_FRAMES;
        for (index, record) in records.iter().enumerate() {
            if record.source_path.is_empty() {
                log::warn!("Skipped clip [{}] with missing sourcePath", index);
                continue;
            }
            let clip = ClipInstance::from_record(record);
            if !clip.source_path.exists() {
                log::warn!("Clip file not found: {}", clip.source_path.display());
                continue;
            }

            if clip.end_on_track_ms > 0 {
                self.total_frames = self.total_frames.max(clip.end_on_track_frame());
            } else {
                log::warn!(
                    "Clip [{}] has invalid endTimeOnTrackMs: {}",
                    index,
                    clip.end_on_track_ms
                );
            }

            log::info!(
                "Added clip [{}]: {}, frames {}-{} (src_start: {})",
                index,
                clip.name,
                clip.start_on_track_frame(),
                clip.end_on_track_frame(),
                time::ms_to_frames(clip.start_in_source_ms)
            );
            self.clips.push(clip);
        }

        if self.clips.is_empty() {
            log::warn!("No valid clips found in the data");
            self.total_frames = DEFAULT_TOTAL_FRAMES;
        }
        log::info!("Timeline updated: {} valid clips", self.clips.len());
        self.clips.len()
    }
}

/// The play/pause/seek cursor driving composite requests. Positions are
/// frame indices; millisecond conversion goes through `core::time`.
#[derive(Debug)]
pub struct PlaybackCursor {
    current_frame: i64,
    total_frames: i64,
    is_playing: bool,
}

impl PlaybackCursor {
    pub fn new(total_frames: i64) -> Self {
        PlaybackCursor {
            current_frame: 0,
            total_frames: total_frames.max(1),
            is_playing: false,
        }
    }

    pub fn current_frame(&self) -> i64 {
        self.current_frame
    }

    pub fn position_ms(&self) -> i64 {
        time::frames_to_ms(self.current_frame)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_total_frames(&mut self, total_frames: i64) {
        self.total_frames = total_frames.max(1);
        self.current_frame = self.current_frame.min(self.total_frames - 1);
    }

    /// Seek to a frame, clamped into the timeline. Returns the frame
    /// actually landed on.
    pub fn seek(&mut self, frame: i64) -> i64 {
        let old = self.current_frame;
        self.current_frame = frame.clamp(0, self.total_frames - 1);
        if (old - self.current_frame).abs() > 1 {
            log::debug!("Seek request: {}, actual: {}", frame, self.current_frame);
        }
        self.current_frame
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Advance one frame, wrapping back to the start at the end of the
    /// timeline. Returns the new frame.
    pub fn advance(&mut self) -> i64 {
        self.current_frame += 1;
        if self.current_frame >= self.total_frames {
            self.current_frame = 0;
        }
        self.current_frame
    }
}
