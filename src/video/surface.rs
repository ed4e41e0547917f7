use std::path::{Path, PathBuf};

/// A decoded frame published to the UI as a platform texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFrame {
    pub texture_id: u64,
    pub width: u32,
    pub height: u32,
}

/// The native media player behind the decode surface. Treated as a
/// black box: load a file, seek by millisecond, hand out the current
/// texture.
pub trait NativePlayer: Send {
    fn load(&mut self, path: &Path) -> anyhow::Result<()>;
    fn seek(&mut self, position_ms: i64) -> anyhow::Result<()>;
    fn pause(&mut self);
    fn acquire_texture(&mut self) -> anyhow::Result<TextureFrame>;
    fn unload(&mut self);

    /// Raw RGBA pixels of the current frame, if the implementation
    /// keeps them around (headless renderers do; a real GPU player
    /// would not).
    fn frame_rgba(&self) -> Option<(&[u8], u32, u32)> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Unloaded,
    Loading,
    Ready,
    Seeking,
}

/// The portion of the source file a clip is allowed to play. Seeks are
/// clamped into this window before reaching the native player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// The single shared decode/render session: one loaded media path, one
/// texture id. Loading a new path invalidates the previous texture, and
/// every native-layer failure resets to `Unloaded` with the texture
/// cleared, so the surface is never half-loaded.
pub struct DecodeSurface {
    player: Box<dyn NativePlayer>,
    state: SurfaceState,
    current_path: Option<PathBuf>,
    window: Option<SourceWindow>,
    texture_id: Option<u64>,
    is_playing: bool,
}

impl DecodeSurface {
    pub fn new(player: Box<dyn NativePlayer>) -> Self {
        DecodeSurface {
            player,
            state: SurfaceState::Unloaded,
            current_path: None,
            window: None,
            texture_id: None,
            is_playing: false,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn texture_id(&self) -> Option<u64> {
        self.texture_id
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn frame_rgba(&self) -> Option<(&[u8], u32, u32)> {
        self.player.frame_rgba()
    }

    /// Load a media file, replacing whatever was loaded before. The
    /// previous texture content is invalidated immediately.
    pub fn set_and_prepare_media(&mut self, path: &Path, window: Option<SourceWindow>) -> bool {
        self.state = SurfaceState::Loading;
        self.texture_id = None;
        match self.player.load(path) {
            Ok(()) => {
                self.current_path = Some(path.to_path_buf());
                self.window = window;
                self.state = SurfaceState::Ready;
                log::debug!("Decode surface loaded {}", path.display());
                true
            }
            Err(e) => {
                self.fail(&format!("load {}", path.display()), e);
                false
            }
        }
    }

    /// Seek within the loaded media. The requested position is clamped
    /// into the current clip's source window first; the surface never
    /// seeks outside the clip's declared range.
    pub fn seek(&mut self, position_ms: i64, pause_after_seek: bool) -> bool {
        if self.state != SurfaceState::Ready {
            log::warn!("Seek requested while surface is {:?}", self.state);
            return false;
        }
        let clamped = match self.window {
            Some(window) => position_ms.clamp(window.start_ms, window.end_ms),
            None => position_ms.max(0),
        };
        if clamped != position_ms {
            log::debug!("Seek {}ms clamped to {}ms", position_ms, clamped);
        }

        self.state = SurfaceState::Seeking;
        match self.player.seek(clamped) {
            Ok(()) => {
                self.state = SurfaceState::Ready;
                if pause_after_seek {
                    self.player.pause();
                    self.is_playing = false;
                }
                true
            }
            Err(e) => {
                self.fail(&format!("seek to {}ms", clamped), e);
                false
            }
        }
    }

    /// Republish the texture id after a seek.
    pub fn update_texture_after_seek(&mut self) -> bool {
        if self.state != SurfaceState::Ready {
            log::warn!("Texture update requested while surface is {:?}", self.state);
            return false;
        }
        match self.player.acquire_texture() {
            Ok(frame) => {
                log::debug!(
                    "Published texture {} ({}x{})",
                    frame.texture_id,
                    frame.width,
                    frame.height
                );
                self.texture_id = Some(frame.texture_id);
                true
            }
            Err(e) => {
                self.fail("acquire texture", e);
                false
            }
        }
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.is_playing = false;
    }

    pub fn clear_media(&mut self) {
        self.player.unload();
        self.state = SurfaceState::Unloaded;
        self.current_path = None;
        self.window = None;
        self.texture_id = None;
        self.is_playing = false;
    }

    fn fail(&mut self, operation: &str, error: anyhow::Error) {
        log::error!("Decode surface failed to {}: {}", operation, error);
        self.player.unload();
        self.state = SurfaceState::Unloaded;
        self.current_path = None;
        self.window = None;
        self.texture_id = None;
        self.is_playing = false;
    }
}
