use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::video::probe::{MediaInfo, MediaProbe};
use crate::video::surface::{NativePlayer, TextureFrame};

/// Headless stand-in for the platform's hardware player: decodes single
/// frames with FFmpeg and publishes them under monotonically increasing
/// texture ids, the same contract a GPU texture registry gives the UI.
pub struct FfmpegFramePlayer {
    ffmpeg: String,
    probe: MediaProbe,
    path: Option<PathBuf>,
    info: Option<MediaInfo>,
    frame: Option<Vec<u8>>,
    next_texture_id: u64,
}

impl FfmpegFramePlayer {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            probe: MediaProbe::with_binary(ffprobe),
            path: None,
            info: None,
            frame: None,
            next_texture_id: 0,
        }
    }

    /// Extract the frame at `position_ms` as raw RGB24 at the source's
    /// native dimensions, then convert to RGBA.
    fn extract_frame(&self, path: &Path, position_ms: i64, info: &MediaInfo) -> Result<Vec<u8>> {
        let output = Command::new(&self.ffmpeg)
            .arg("-ss")
            .arg(format!("{:.6}", position_ms as f64 / 1000.0))
            .arg("-i")
            .arg(path)
            .arg("-vframes")
            .arg("1")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(format!("{}x{}", info.width, info.height))
            .arg("-v")
            .arg("quiet")
            .arg("-")
            .output()?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "FFmpeg frame extraction failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let frame_data = output.stdout;
        let expected_size = (info.width * info.height * 3) as usize;
        if frame_data.len() != expected_size {
            return Err(anyhow::anyhow!(
                "Unexpected frame size: {} (expected {})",
                frame_data.len(),
                expected_size
            ));
        }

        let mut rgba = Vec::with_capacity((info.width * info.height * 4) as usize);
        for chunk in frame_data.chunks(3) {
            if chunk.len() == 3 {
                rgba.push(chunk[0]);
                rgba.push(chunk[1]);
                rgba.push(chunk[2]);
                rgba.push(255);
            }
        }
        Ok(rgba)
    }
}

impl Default for FfmpegFramePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl NativePlayer for FfmpegFramePlayer {
    fn load(&mut self, path: &Path) -> Result<()> {
        let info = self.probe.probe(path)?;
        log::debug!(
            "Player loaded {}: {}x{}, {}ms",
            path.display(),
            info.width,
            info.height,
            info.duration_ms
        );
        self.path = Some(path.to_path_buf());
        self.info = Some(info);
        self.frame = None;
        Ok(())
    }

    fn seek(&mut self, position_ms: i64) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Seek with no media loaded"))?;
        let info = self
            .info
            .ok_or_else(|| anyhow::anyhow!("Seek with no media info"))?;
        let clamped = position_ms.clamp(0, info.duration_ms.max(0));
        self.frame = Some(self.extract_frame(&path, clamped, &info)?);
        Ok(())
    }

    fn pause(&mut self) {
        // Frame extraction is one-shot; there is no running decode to
        // halt.
    }

    fn acquire_texture(&mut self) -> Result<TextureFrame> {
        let info = self
            .info
            .ok_or_else(|| anyhow::anyhow!("No media loaded"))?;
        if self.frame.is_none() {
            return Err(anyhow::anyhow!("No decoded frame to publish"));
        }
        self.next_texture_id += 1;
        Ok(TextureFrame {
            texture_id: self.next_texture_id,
            width: info.width,
            height: info.height,
        })
    }

    fn unload(&mut self) {
        self.path = None;
        self.info = None;
        self.frame = None;
    }

    fn frame_rgba(&self) -> Option<(&[u8], u32, u32)> {
        let info = self.info?;
        self.frame
            .as_deref()
            .map(|data| (data, info.width, info.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_fails() {
        let mut player = FfmpegFramePlayer::new();
        assert!(player.load(Path::new("/definitely/not/here.mp4")).is_err());
    }

    #[test]
    fn test_seek_without_media_fails() {
        let mut player = FfmpegFramePlayer::new();
        assert!(player.seek(0).is_err());
    }

    #[test]
    fn test_texture_without_frame_fails() {
        let mut player = FfmpegFramePlayer::new();
        assert!(player.acquire_texture().is_err());
        assert!(player.frame_rgba().is_none());
    }
}
