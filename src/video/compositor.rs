use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Target canvas for a composite, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// One source feeding a composite: the media file and the offset inside
/// it that corresponds to the query timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeInput {
    pub source_path: std::path::PathBuf,
    pub source_offset_ms: i64,
}

/// Screen rectangle for one input in layout mode, canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Placement plus flip flags for one input in layout mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipLayout {
    pub rect: LayoutRect,
    pub flip_h: bool,
    pub flip_v: bool,
}

/// The external frame-compositing boundary. Implementations must never
/// panic or propagate errors across this trait; failure is the `false`
/// return and callers are required to check it.
pub trait CompositorBridge: Send + Sync {
    fn generate_composite(
        &self,
        inputs: &[CompositeInput],
        layout: Option<&[ClipLayout]>,
        output_path: &Path,
        canvas: CanvasSize,
    ) -> bool;
}

/// FFmpeg-backed compositor. Produces a single rendered frame at the
/// caller-provided output path; the caller owns that file's lifetime.
pub struct FfmpegCompositor {
    ffmpeg: String,
}

/// Side-by-side mode only ever composites this many inputs; extra
/// active clips are dropped with a warning.
const MAX_STACKED_INPUTS: usize = 2;

impl FfmpegCompositor {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn run(
        &self,
        inputs: &[CompositeInput],
        layout: Option<&[ClipLayout]>,
        output_path: &Path,
        canvas: CanvasSize,
    ) -> Result<()> {
        let used = match layout {
            Some(_) => inputs,
            None => {
                if inputs.len() > MAX_STACKED_INPUTS {
                    log::warn!(
                        "Side-by-side composite capped at {} inputs; dropping {}",
                        MAX_STACKED_INPUTS,
                        inputs.len() - MAX_STACKED_INPUTS
                    );
                }
                &inputs[..inputs.len().min(MAX_STACKED_INPUTS)]
            }
        };

        let mut cmd = Command::new(&self.ffmpeg);
        for input in used {
            let offset = format!("{:.3}", input.source_offset_ms as f64 / 1000.0);
            cmd.arg("-ss").arg(&offset).arg("-i").arg(&input.source_path);
        }

        let filter = build_filter_graph(used.len(), layout, canvas);
        cmd.arg("-filter_complex")
            .arg(&filter)
            .arg("-map")
            .arg("[out]")
            .arg("-frames:v")
            .arg("1")
            .arg("-y")
            .arg(output_path);

        log::debug!("Compositing {} inputs with filter: {}", used.len(), filter);

        let output = cmd.output()?;
        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!("FFmpeg error: {}", error));
        }
        Ok(())
    }
}

impl Default for FfmpegCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositorBridge for FfmpegCompositor {
    fn generate_composite(
        &self,
        inputs: &[CompositeInput],
        layout: Option<&[ClipLayout]>,
        output_path: &Path,
        canvas: CanvasSize,
    ) -> bool {
        if inputs.is_empty() {
            log::warn!("Composite requested with no inputs");
            return false;
        }
        if let Some(layout) = layout {
            if layout.len() != inputs.len() {
                log::error!(
                    "Layout entry count {} does not match input count {}",
                    layout.len(),
                    inputs.len()
                );
                return false;
            }
        }
        for input in inputs {
            if !input.source_path.exists() {
                log::error!(
                    "Composite input not found: {}",
                    input.source_path.display()
                );
                return false;
            }
        }

        match self.run(inputs, layout, output_path, canvas) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Composite generation failed: {}", e);
                false
            }
        }
    }
}

/// Assemble the filter_complex graph. With no layout, one input scales
/// to the full canvas and two stack side-by-side; with a layout, every
/// input is scaled/flipped to its rectangle and overlaid in order onto
/// a black base.
pub fn build_filter_graph(
    input_count: usize,
    layout: Option<&[ClipLayout]>,
    canvas: CanvasSize,
) -> String {
    match layout {
        None => {
            if input_count <= 1 {
                format!("[0:v]scale={}:{}[out]", canvas.width, canvas.height)
            } else {
                let half = (canvas.width / 2).max(1);
                format!(
                    "[0:v]scale={half}:{ch}[left];[1:v]scale={half}:{ch}[right];[left][right]hstack=inputs=2[out]",
                    half = half,
                    ch = canvas.height
                )
            }
        }
        Some(layout) => {
            let mut parts = vec![format!(
                "color=c=black:s={}x{}[base]",
                canvas.width, canvas.height
            )];
            for (i, entry) in layout.iter().enumerate() {
                let width = entry.rect.width.clamp(1, canvas.width);
                let height = entry.rect.height.clamp(1, canvas.height);
                let mut chain = format!("[{i}:v]scale={width}:{height}");
                if entry.flip_h {
                    chain.push_str(",hflip");
                }
                if entry.flip_v {
                    chain.push_str(",vflip");
                }
                chain.push_str(&format!("[v{i}]"));
                parts.push(chain);
            }
            let mut previous = "base".to_string();
            for (i, entry) in layout.iter().enumerate() {
                let label = if i == layout.len() - 1 {
                    "out".to_string()
                } else {
                    format!("t{i}")
                };
                parts.push(format!(
                    "[{previous}][v{i}]overlay={x}:{y}[{label}]",
                    x = entry.rect.x,
                    y = entry.rect.y,
                ));
                previous = label;
            }
            parts.join(";")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CANVAS: CanvasSize = CanvasSize {
        width: 1280,
        height: 720,
    };

    fn layout(x: i32, y: i32, w: u32, h: u32) -> ClipLayout {
        ClipLayout {
            rect: LayoutRect {
                x,
                y,
                width: w,
                height: h,
            },
            flip_h: false,
            flip_v: false,
        }
    }

    #[test]
    fn test_single_input_scales_to_canvas() {
        let graph = build_filter_graph(1, None, CANVAS);
        assert_eq!(graph, "[0:v]scale=1280:720[out]");
    }

    #[test]
    fn test_two_inputs_stack_side_by_side() {
        let graph = build_filter_graph(2, None, CANVAS);
        assert!(graph.contains("[0:v]scale=640:720[left]"));
        assert!(graph.contains("[1:v]scale=640:720[right]"));
        assert!(graph.contains("[left][right]hstack=inputs=2[out]"));
    }

    #[test]
    fn test_layout_overlays_onto_black_base() {
        let entries = [layout(10, 20, 300, 200), layout(400, 0, 640, 360)];
        let graph = build_filter_graph(2, Some(&entries), CANVAS);
        assert!(graph.starts_with("color=c=black:s=1280x720[base]"));
        assert!(graph.contains("[0:v]scale=300:200[v0]"));
        assert!(graph.contains("[base][v0]overlay=10:20[t0]"));
        assert!(graph.contains("[t0][v1]overlay=400:0[out]"));
    }

    #[test]
    fn test_layout_dimensions_are_clamped_to_canvas() {
        let entries = [layout(0, 0, 5000, 0)];
        let graph = build_filter_graph(1, Some(&entries), CANVAS);
        assert!(graph.contains("[0:v]scale=1280:1[v0]"));
    }

    #[test]
    fn test_layout_flips_are_applied() {
        let entries = [ClipLayout {
            rect: LayoutRect {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            },
            flip_h: true,
            flip_v: true,
        }];
        let graph = build_filter_graph(1, Some(&entries), CANVAS);
        assert!(graph.contains("scale=100:100,hflip,vflip[v0]"));
    }

    #[test]
    fn test_missing_input_returns_false() {
        let bridge = FfmpegCompositor::new();
        let inputs = [CompositeInput {
            source_path: PathBuf::from("/definitely/not/here.mp4"),
            source_offset_ms: 0,
        }];
        let output = std::env::temp_dir().join("flipedit-compositor-test.mp4");
        assert!(!bridge.generate_composite(&inputs, None, &output, CANVAS));
    }

    #[test]
    fn test_empty_inputs_return_false() {
        let bridge = FfmpegCompositor::new();
        let output = std::env::temp_dir().join("flipedit-compositor-test.mp4");
        assert!(!bridge.generate_composite(&[], None, &output, CANVAS));
    }

    #[test]
    fn test_mismatched_layout_returns_false() {
        let bridge = FfmpegCompositor::new();
        let dir = std::env::temp_dir().join("flipedit-compositor-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let input_path = dir.join(format!("{}.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&input_path, b"stub").unwrap();

        let inputs = [CompositeInput {
            source_path: input_path,
            source_offset_ms: 0,
        }];
        let entries = [layout(0, 0, 10, 10), layout(0, 0, 10, 10)];
        let output = dir.join("out.mp4");
        assert!(!bridge.generate_composite(&inputs, Some(&entries), &output, CANVAS));
    }
}
