use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::{
    foundation::{
        core::{Rgba8, Viewport},
        error::SmilResult,
    },
    model::scene::SceneModel,
    render::{
        dirty::{DirtyAreaManager, DirtyRegion},
        graphics::{FrameRGBA, RenderGraphics},
        paint::{ImageResolver, PaintStats, paint_region},
        tile::Tile,
    },
    runtime::queue::{RunHandler, UpdateQueue},
};

/// Lets the canvas ask the update queue for a later retry.
pub trait RepaintScheduler {
    /// Number of one-shot tasks waiting to run.
    fn queued(&self) -> usize;

    /// Queues a no-op at the head of the queue whose run handler calls
    /// [`SimpleCanvasManager::update_canvas`] again.
    fn schedule_retry(&self) -> SmilResult<()>;
}

/// Update-thread state that owns a canvas.
pub trait CanvasHost: Send + 'static {
    fn update_canvas(&mut self, scheduler: &dyn RepaintScheduler) -> SmilResult<()>;
}

impl<S: CanvasHost> RepaintScheduler for UpdateQueue<S> {
    fn queued(&self) -> usize {
        self.size()
    }

    fn schedule_retry(&self) -> SmilResult<()> {
        let queue = self.clone();
        let handler: RunHandler<S> = Arc::new(move |s: &mut S| {
            if let Err(err) = s.update_canvas(&queue) {
                tracing::error!(error = %err, "canvas update failed");
            }
        });
        self.preempt_later(|_: &mut S| {}, Some(handler))
    }
}

#[derive(Debug)]
struct Flags {
    canvas_consumed: bool,
    need_repaint: bool,
    frame: Option<FrameRGBA>,
    frames: u64,
}

#[derive(Debug)]
struct CanvasShared {
    flags: Mutex<Flags>,
    cond: Condvar,
}

impl CanvasShared {
    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Display-side handle on a canvas: reads finished frames and hands them
/// back with [`CanvasConsumer::consume`].
#[derive(Clone, Debug)]
pub struct CanvasConsumer {
    shared: Arc<CanvasShared>,
}

impl CanvasConsumer {
    /// Marks the current frame as shown and wakes anyone waiting on it.
    pub fn consume(&self) {
        let mut flags = self.shared.lock();
        flags.canvas_consumed = true;
        self.shared.cond.notify_all();
    }

    pub fn is_consumed(&self) -> bool {
        self.shared.lock().canvas_consumed
    }

    /// Number of frames published so far.
    pub fn frame_count(&self) -> u64 {
        self.shared.lock().frames
    }

    /// Latest published frame, whether consumed or not.
    pub fn latest_frame(&self) -> Option<FrameRGBA> {
        self.shared.lock().frame.clone()
    }

    /// Waits up to `timeout` for an unconsumed frame and returns it.
    pub fn wait_for_frame(&self, timeout: Duration) -> Option<FrameRGBA> {
        let deadline = Instant::now() + timeout;
        let mut flags = self.shared.lock();
        while flags.canvas_consumed {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return None;
            }
            flags = self
                .shared
                .cond
                .wait_timeout(flags, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        flags.frame.clone()
    }
}

/// Summary handed to the update-complete listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasUpdate {
    pub full: bool,
    pub stats: PaintStats,
}

type UpdateListener = Box<dyn FnMut(&CanvasUpdate) + Send>;

/// Producer side of the canvas handshake.
///
/// A repaint happens only when something changed and the display has
/// consumed the previous frame. When the previous frame is still on screen
/// the update is deferred: if the queue is idle a placeholder task is
/// queued so the update is retried, otherwise the next queued task's run
/// handler retries it.
pub struct SimpleCanvasManager {
    shared: Arc<CanvasShared>,
    graphics: Box<dyn RenderGraphics>,
    dirty: DirtyAreaManager,
    use_dirty_areas: bool,
    clear: Rgba8,
    off: bool,
    listener: Option<UpdateListener>,
}

impl std::fmt::Debug for SimpleCanvasManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleCanvasManager")
            .field("viewport", &self.graphics.viewport())
            .field("use_dirty_areas", &self.use_dirty_areas)
            .field("off", &self.off)
            .finish()
    }
}

impl SimpleCanvasManager {
    pub fn new(
        graphics: Box<dyn RenderGraphics>,
        tile_min_size: u32,
        use_dirty_areas: bool,
        clear: Rgba8,
    ) -> SmilResult<Self> {
        let dirty = DirtyAreaManager::new(graphics.viewport(), tile_min_size)?;
        Ok(Self {
            shared: Arc::new(CanvasShared {
                flags: Mutex::new(Flags {
                    canvas_consumed: true,
                    need_repaint: true,
                    frame: None,
                    frames: 0,
                }),
                cond: Condvar::new(),
            }),
            graphics,
            dirty,
            use_dirty_areas,
            clear,
            off: false,
            listener: None,
        })
    }

    pub fn consumer(&self) -> CanvasConsumer {
        CanvasConsumer {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn graphics(&self) -> &dyn RenderGraphics {
        self.graphics.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.graphics.viewport()
    }

    pub fn set_update_listener(&mut self, listener: impl FnMut(&CanvasUpdate) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn need_repaint(&self) -> bool {
        self.shared.lock().need_repaint
    }

    /// Sets the background and forces a full repaint.
    pub fn set_clear_paint(&mut self, clear: Rgba8) {
        self.clear = clear;
        self.dirty.invalidate();
        self.shared.lock().need_repaint = true;
    }

    pub fn is_off(&self) -> bool {
        self.off
    }

    /// Stops painting until [`SimpleCanvasManager::turn_on`].
    pub fn turn_off(&mut self) {
        self.off = true;
    }

    /// Resumes painting with a full repaint.
    pub fn turn_on(&mut self) {
        self.off = false;
        self.dirty.invalidate();
        self.shared.lock().need_repaint = true;
    }

    /// Run handler entry point: paints if the scene changed and the last
    /// frame was consumed, defers otherwise. Returns `true` if it painted.
    #[tracing::instrument(skip_all)]
    pub fn update_canvas(
        &mut self,
        scene: &mut SceneModel,
        images: &dyn ImageResolver,
        scheduler: &dyn RepaintScheduler,
    ) -> SmilResult<bool> {
        if self.off {
            return Ok(false);
        }
        let consumed = {
            let mut flags = self.shared.lock();
            if scene.needs_repaint() {
                flags.need_repaint = true;
                scene.set_needs_repaint(false);
            }
            if !flags.need_repaint {
                return Ok(false);
            }
            flags.canvas_consumed
        };
        if consumed {
            let painted = self.full_paint(scene, images)?;
            self.shared.lock().need_repaint = false;
            Ok(painted)
        } else {
            if scheduler.queued() == 0 {
                tracing::debug!("frame not consumed yet, scheduling retry");
                scheduler.schedule_retry()?;
            }
            Ok(false)
        }
    }

    /// Repaints the dirty region, or the whole canvas when dirty-area
    /// tracking is off, then publishes the frame.
    pub fn full_paint(
        &mut self,
        scene: &mut SceneModel,
        images: &dyn ImageResolver,
    ) -> SmilResult<bool> {
        if self.graphics.viewport() != scene.viewport() {
            self.graphics.set_viewport(scene.viewport())?;
        }
        scene.collect_dirty_areas(&mut self.dirty);
        let mut region = self.dirty.take_dirty_region();
        if !self.use_dirty_areas && !region.is_clean() {
            region = DirtyRegion::Full(Tile::viewport(scene.viewport()));
        }
        if region.is_clean() {
            return Ok(false);
        }

        let stats = paint_region(scene, self.graphics.as_mut(), &region, self.clear, images)?;
        let update = CanvasUpdate {
            full: region.is_full(),
            stats,
        };
        let frame = self.graphics.frame();
        {
            let mut flags = self.shared.lock();
            flags.frame = frame;
            flags.frames += 1;
            flags.canvas_consumed = false;
            self.shared.cond.notify_all();
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(&update);
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
