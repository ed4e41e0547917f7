use anyhow::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

/// Basic properties of a media file as reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration_ms: i64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// ffprobe front-end with an LRU cache so repeated composite requests
/// against the same sources only probe once.
pub struct MediaProbe {
    ffprobe: String,
    cache: Mutex<LruCache<PathBuf, MediaInfo>>,
}

impl MediaProbe {
    const CACHE_SIZE: usize = 32;

    pub fn new() -> Self {
        Self::with_binary("ffprobe")
    }

    pub fn with_binary(ffprobe: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(Self::CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn probe(&self, file_path: &Path) -> Result<MediaInfo> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(info) = cache.get(file_path) {
                return Ok(*info);
            }
        }

        let info = self.probe_uncached(file_path)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(file_path.to_path_buf(), info);
        }
        Ok(info)
    }

    fn probe_uncached(&self, file_path: &Path) -> Result<MediaInfo> {
        if !file_path.exists() {
            return Err(anyhow::anyhow!(
                "File does not exist: {}",
                file_path.display()
            ));
        }

        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(file_path)
            .output()?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "ffprobe failed for {}: {}",
                file_path.display(),
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

        let duration_secs = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        let duration_ms = (duration_secs * 1000.0).round() as i64;

        let empty_vec = vec![];
        let streams = json["streams"].as_array().unwrap_or(&empty_vec);
        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"))
            .ok_or_else(|| anyhow::anyhow!("No video stream in {}", file_path.display()))?;

        let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
        let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
        let fps = video_stream["r_frame_rate"]
            .as_str()
            .map(parse_rational_fps)
            .unwrap_or(30.0);

        log::debug!(
            "Probed {}: {}x{}, {}ms at {:.2} fps",
            file_path.display(),
            width,
            height,
            duration_ms,
            fps
        );

        Ok(MediaInfo {
            duration_ms,
            width,
            height,
            fps,
        })
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse ffprobe's rational frame rate (formats like "30/1" or
/// "30000/1001"), falling back to 30 on anything malformed.
fn parse_rational_fps(value: &str) -> f64 {
    if let Some((numerator, denominator)) = value.split_once('/') {
        let numerator: f64 = numerator.parse().unwrap_or(0.0);
        let denominator: f64 = denominator.parse().unwrap_or(0.0);
        if denominator != 0.0 && numerator > 0.0 {
            return numerator / denominator;
        }
        return 30.0;
    }
    value.parse().unwrap_or(30.0)
}
