use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Core configuration shared by the compositing pipeline: preview canvas
/// size, frame rate, tool binary overrides and the transient-file
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub frame_rate: i64,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            frame_rate: crate::core::time::FRAME_RATE,
            ffmpeg_path: None,
            ffprobe_path: None,
            temp_dir: None,
        }
    }
}

impl CoreConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;

            // If the file is unreadable as config (missing fields, old
            // format), recreate it with defaults rather than failing.
            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!(
                        "Config file exists but has issues ({}), creating new one with defaults",
                        e
                    );
                    let new_config = Self::default();
                    new_config
                        .save()
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config
                .save()
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flipedit")
            .join("core.json")
    }

    pub fn ffmpeg_binary(&self) -> String {
        self.ffmpeg_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ffmpeg".to_string())
    }

    pub fn ffprobe_binary(&self) -> String {
        self.ffprobe_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ffprobe".to_string())
    }

    /// Directory for transient composite output files.
    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("flipedit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = CoreConfig::default();
        assert_eq!(config.canvas_width, 1280);
        assert_eq!(config.canvas_height, 720);
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.ffmpeg_binary(), "ffmpeg");
        assert_eq!(config.ffprobe_binary(), "ffprobe");
    }

    #[test]
    fn test_binary_overrides() {
        let config = CoreConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..Default::default()
        };
        assert_eq!(config.ffmpeg_binary(), "/opt/ffmpeg/bin/ffmpeg");
    }

    #[test]
    fn test_temp_dir_override() {
        let config = CoreConfig {
            temp_dir: Some(PathBuf::from("/tmp/override")),
            ..Default::default()
        };
        assert_eq!(config.effective_temp_dir(), PathBuf::from("/tmp/override"));

        let default_config = CoreConfig::default();
        assert!(default_config
            .effective_temp_dir()
            .ends_with("flipedit"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = CoreConfig {
            canvas_width: 1920,
            canvas_height: 1080,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.canvas_width, 1920);
        assert_eq!(restored.canvas_height, 1080);
    }
}
