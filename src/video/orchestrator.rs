use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::core::clip::ClipInstance;
use crate::video::compositor::{CanvasSize, CompositeInput, CompositorBridge};
use crate::video::resolver::{resolve_active_clips, LayoutMap};
use crate::video::surface::{DecodeSurface, NativePlayer, SourceWindow};

/// Notifications published to the UI layer after each composite
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositorEvent {
    /// The processing flag: raised before a composite starts, lowered
    /// when it finishes, on every path.
    Processing(bool),
    /// A new texture is available for display.
    TexturePublished(u64),
    /// No active clips at the requested position; the surface was
    /// cleared and paused.
    SurfaceCleared,
}

/// Input to one compositing operation.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub clips: Vec<ClipInstance>,
    pub layout: Option<LayoutMap>,
    pub position_ms: i64,
    pub canvas: CanvasSize,
}

/// Top-level coordinator for the compositing pipeline.
///
/// Owns the one decode surface and the one transient output file, and
/// enforces at-most-one composite in flight: the busy flag is taken
/// synchronously before any external call, so overlapping async
/// requests cannot interleave. A rejected request is dropped, never
/// queued; callers retry on their next tick.
pub struct CompositeOrchestrator {
    bridge: Box<dyn CompositorBridge>,
    surface: Mutex<DecodeSurface>,
    busy: AtomicBool,
    transient_output: Mutex<Option<PathBuf>>,
    temp_dir: PathBuf,
    events: broadcast::Sender<CompositorEvent>,
}

impl CompositeOrchestrator {
    pub fn new(
        bridge: Box<dyn CompositorBridge>,
        player: Box<dyn NativePlayer>,
        temp_dir: PathBuf,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        CompositeOrchestrator {
            bridge,
            surface: Mutex::new(DecodeSurface::new(player)),
            busy: AtomicBool::new(false),
            transient_output: Mutex::new(None),
            temp_dir,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompositorEvent> {
        self.events.subscribe()
    }

    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn texture_id(&self) -> Option<u64> {
        lock_ignoring_poison(&self.surface).texture_id()
    }

    /// Run a callback against the decode surface, e.g. to read the
    /// published frame.
    pub fn with_surface<R>(&self, f: impl FnOnce(&DecodeSurface) -> R) -> R {
        f(&lock_ignoring_poison(&self.surface))
    }

    /// Composite the timeline at the request's position.
    ///
    /// Returns `false` both for rejected-while-busy and for failed
    /// composites; an empty timeline position is a success (the surface
    /// is cleared).
    pub fn composite_at(&self, request: &CompositeRequest) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!(
                "Composite request at {}ms rejected: another composite is in flight",
                request.position_ms
            );
            return false;
        }
        // Released by the guard on every exit path below.
        let _guard = ProcessingGuard::begin(&self.busy, &self.events);

        self.composite_inner(request)
    }

    fn composite_inner(&self, request: &CompositeRequest) -> bool {
        let position_ms = if request.position_ms < 1 {
            0
        } else {
            request.position_ms
        };

        let active = resolve_active_clips(&request.clips, position_ms, request.layout.as_ref());

        if active.is_empty() {
            log::debug!("No active clips at {}ms, clearing surface", position_ms);
            let mut surface = lock_ignoring_poison(&self.surface);
            surface.clear_media();
            surface.pause();
            self.emit(CompositorEvent::SurfaceCleared);
            return true;
        }

        if active.len() == 1 {
            self.composite_single(active[0], position_ms)
        } else {
            self.composite_multi(&active, position_ms, request)
        }
    }

    /// Fast path: one active clip plays straight off its source file,
    /// skipping the external compositor entirely.
    fn composite_single(&self, clip: &ClipInstance, position_ms: i64) -> bool {
        let offset_ms = clip.source_position_for(position_ms);
        log::debug!(
            "Single-clip composite: {} at source {}ms",
            clip.source_path.display(),
            offset_ms
        );

        let window = SourceWindow {
            start_ms: clip.start_in_source_ms,
            end_ms: clip.end_in_source_ms,
        };
        let mut surface = lock_ignoring_poison(&self.surface);
        if !surface.set_and_prepare_media(&clip.source_path, Some(window))
            || !surface.seek(offset_ms, true)
            || !surface.update_texture_after_seek()
        {
            return self.fail_and_cleanup(&mut surface);
        }
        if let Some(texture_id) = surface.texture_id() {
            self.emit(CompositorEvent::TexturePublished(texture_id));
        }
        true
    }

    /// Multi-clip path: render the overlapping clips to a transient
    /// file through the external compositor, then load that file.
    fn composite_multi(
        &self,
        active: &[&ClipInstance],
        position_ms: i64,
        request: &CompositeRequest,
    ) -> bool {
        self.remove_transient_output();

        let mut inputs = Vec::with_capacity(active.len());
        let mut layouts = Vec::new();
        for clip in active {
            if let Some(map) = &request.layout {
                match clip.id.as_deref().and_then(|id| map.get(id)) {
                    Some(entry) => layouts.push(*entry),
                    None => {
                        log::warn!("Clip '{}' lost its layout entry, skipping", clip.name);
                        continue;
                    }
                }
            }
            inputs.push(CompositeInput {
                source_path: clip.source_path.clone(),
                source_offset_ms: clip.source_position_for(position_ms),
            });
        }

        if let Err(e) = std::fs::create_dir_all(&self.temp_dir) {
            log::error!(
                "Failed to create temp dir {}: {}",
                self.temp_dir.display(),
                e
            );
            let mut surface = lock_ignoring_poison(&self.surface);
            return self.fail_and_cleanup(&mut surface);
        }
        let output_path = self
            .temp_dir
            .join(format!("composite_{}.mp4", uuid::Uuid::new_v4()));
        // Track the path before invoking the bridge so a partial write
        // still gets cleaned up on failure.
        *lock_ignoring_poison(&self.transient_output) = Some(output_path.clone());

        log::debug!(
            "Multi-clip composite: {} inputs -> {}",
            inputs.len(),
            output_path.display()
        );
        let layout_arg = request.layout.as_ref().map(|_| layouts.as_slice());
        let generated =
            self.bridge
                .generate_composite(&inputs, layout_arg, &output_path, request.canvas);

        let mut surface = lock_ignoring_poison(&self.surface);
        if !generated {
            return self.fail_and_cleanup(&mut surface);
        }

        // The generated file is a single rendered segment; it is always
        // loaded from position 0, not by source time.
        if !surface.set_and_prepare_media(&output_path, None)
            || !surface.seek(0, true)
            || !surface.update_texture_after_seek()
        {
            return self.fail_and_cleanup(&mut surface);
        }
        if let Some(texture_id) = surface.texture_id() {
            self.emit(CompositorEvent::TexturePublished(texture_id));
        }
        true
    }

    fn fail_and_cleanup(&self, surface: &mut DecodeSurface) -> bool {
        self.remove_transient_output();
        surface.clear_media();
        false
    }

    /// Delete the current transient composite file, if any. Idempotent;
    /// filesystem errors are logged and swallowed so cleanup itself can
    /// never fail a request.
    fn remove_transient_output(&self) {
        let path = lock_ignoring_poison(&self.transient_output).take();
        if let Some(path) = path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!(
                        "Failed to remove transient composite {}: {}",
                        path.display(),
                        e
                    );
                } else {
                    log::debug!("Removed transient composite {}", path.display());
                }
            }
        }
    }

    fn emit(&self, event: CompositorEvent) {
        // Send fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

impl Drop for CompositeOrchestrator {
    fn drop(&mut self) {
        self.remove_transient_output();
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Finally-equivalent for one composite attempt: raises the processing
/// flag immediately and guarantees the busy flag is released and the
/// flag lowered on every exit path, including early returns.
struct ProcessingGuard<'a> {
    busy: &'a AtomicBool,
    events: &'a broadcast::Sender<CompositorEvent>,
}

impl<'a> ProcessingGuard<'a> {
    fn begin(busy: &'a AtomicBool, events: &'a broadcast::Sender<CompositorEvent>) -> Self {
        let _ = events.send(CompositorEvent::Processing(true));
        ProcessingGuard { busy, events }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.events.send(CompositorEvent::Processing(false));
        self.busy.store(false, Ordering::SeqCst);
    }
}
