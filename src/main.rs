use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use flipedit_core::core::clip::{ClipInstance, ClipRecord};
use flipedit_core::core::config::CoreConfig;
use flipedit_core::video::compositor::{CanvasSize, ClipLayout, FfmpegCompositor, LayoutRect};
use flipedit_core::video::orchestrator::{CompositeOrchestrator, CompositeRequest};
use flipedit_core::video::player::FfmpegFramePlayer;
use flipedit_core::video::resolver::LayoutMap;

/// Headless renderer: composite the timeline at one timestamp and write
/// the frame as a PNG.
///
/// Usage: flipedit-core <clips.json> <position_ms> <output.png> [--layout]
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <clips.json> <position_ms> <output.png> [--layout]",
            args[0]
        );
        std::process::exit(2);
    }
    let clips_path = PathBuf::from(&args[1]);
    let position_ms: i64 = args[2]
        .parse()
        .with_context(|| format!("invalid position '{}'", args[2]))?;
    let output_path = PathBuf::from(&args[3]);
    let layout_mode = args.iter().any(|a| a == "--layout");

    let config = CoreConfig::load().unwrap_or_else(|e| {
        log::warn!("Falling back to default config: {}", e);
        CoreConfig::default()
    });

    let json = std::fs::read_to_string(&clips_path)
        .with_context(|| format!("failed to read {}", clips_path.display()))?;
    let records: Vec<ClipRecord> =
        serde_json::from_str(&json).context("failed to parse clip list")?;
    let clips: Vec<ClipInstance> = records.iter().map(ClipInstance::from_record).collect();
    log::info!("Loaded {} clips from {}", clips.len(), clips_path.display());

    let canvas = CanvasSize {
        width: config.canvas_width,
        height: config.canvas_height,
    };
    let layout = if layout_mode {
        Some(layout_from_metadata(&clips, canvas))
    } else {
        None
    };

    let orchestrator = CompositeOrchestrator::new(
        Box::new(FfmpegCompositor::with_binary(config.ffmpeg_binary())),
        Box::new(FfmpegFramePlayer::with_binaries(
            config.ffmpeg_binary(),
            config.ffprobe_binary(),
        )),
        config.effective_temp_dir(),
    );

    let request = CompositeRequest {
        clips,
        layout,
        position_ms,
        canvas,
    };
    if !orchestrator.composite_at(&request) {
        return Err(anyhow!("compositing failed at {}ms", position_ms));
    }

    orchestrator.with_surface(|surface| {
        let (pixels, width, height) = surface
            .frame_rgba()
            .ok_or_else(|| anyhow!("no frame decoded at {}ms", position_ms))?;
        let image = image::RgbaImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;
        image
            .save(&output_path)
            .with_context(|| format!("failed to write {}", output_path.display()))
    })?;

    log::info!("Wrote {}", output_path.display());
    Ok(())
}

/// Derive per-clip placements from the persisted preview transforms.
/// Clips without a rect get a full-canvas default.
fn layout_from_metadata(clips: &[ClipInstance], canvas: CanvasSize) -> LayoutMap {
    let mut layout = LayoutMap::new();
    for clip in clips {
        let id = match clip.id.as_deref() {
            Some(id) => id,
            None => continue,
        };
        let rect = match clip.metadata.preview_rect {
            Some(rect) => LayoutRect {
                x: rect.left.round() as i32,
                y: rect.top.round() as i32,
                width: rect.width.round().max(1.0) as u32,
                height: rect.height.round().max(1.0) as u32,
            },
            None => LayoutRect {
                x: 0,
                y: 0,
                width: canvas.width,
                height: canvas.height,
            },
        };
        layout.insert(
            id.to_string(),
            ClipLayout {
                rect,
                flip_h: clip.metadata.flip_horizontal(),
                flip_v: clip.metadata.flip_vertical(),
            },
        );
    }
    layout
}
