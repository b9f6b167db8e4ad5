use std::sync::Arc;

use crate::{
    animation::value::AnimValue,
    assets::{decode::RasterImage, loader::ImageLoader},
    foundation::{
        core::{NodeId, Point},
        error::{SmilError, SmilResult},
    },
    model::{document::Document, scene::SceneModel, traits::TraitId},
    render::{
        canvas::{CanvasConsumer, CanvasHost, RepaintScheduler, SimpleCanvasManager},
        graphics::RenderGraphics,
        paint::ImageResolver,
    },
    runtime::{
        animator::{Animator, AnimatorState, SampleHost},
        clock::Clock,
        config::EngineConfig,
        queue::{RunHandler, UpdateQueue},
        sampler::SmilSampler,
    },
};

/// Image hrefs referenced by attached nodes, in paint order, deduplicated.
pub fn referenced_images(scene: &SceneModel) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in scene.paint_order() {
        if let Some(href) = scene.href(id)
            && !out.contains(&href)
        {
            out.push(href);
        }
    }
    out
}

/// Loads every referenced image on the calling thread.
pub fn preload_images(scene: &SceneModel, images: &ImageLoader) {
    for href in referenced_images(scene) {
        images.image_and_wait(&href);
    }
}

/// Everything the update thread owns while a document plays.
pub struct EngineState {
    document: Document,
    sampler: SmilSampler,
    canvas: Option<SimpleCanvasManager>,
    images: ImageLoader,
    queue: Option<UpdateQueue<EngineState>>,
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineState")
            .field("sampler", &self.sampler)
            .field("canvas", &self.canvas)
            .field("images", &self.images)
            .finish()
    }
}

impl EngineState {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn current_time(&self) -> i64 {
        self.sampler.current_time()
    }

    pub fn canvas_mut(&mut self) -> Option<&mut SimpleCanvasManager> {
        self.canvas.as_mut()
    }

    /// Starts background loads for images nobody asked for yet. Each
    /// completion comes back to the update thread as a task.
    fn request_images(&mut self) {
        let Some(queue) = self.queue.clone() else {
            return;
        };
        for href in referenced_images(self.document.scene()) {
            if !self.images.need_loading(&href) {
                continue;
            }
            let queue = queue.clone();
            self.images.image_later(
                &href,
                Box::new(move |uri: &str, _img: RasterImage| {
                    let uri = uri.to_owned();
                    if let Err(err) = queue.invoke_later(move |s: &mut EngineState| s.image_arrived(&uri)) {
                        tracing::warn!(error = %err, "image arrived after the update queue stopped");
                    }
                }),
            );
        }
    }

    fn image_arrived(&mut self, href: &str) {
        tracing::debug!(href, "image ready");
        let scene = self.document.scene_mut();
        for id in scene.nodes_with_href(href) {
            if let Err(err) = scene.touch(id) {
                tracing::warn!(?id, error = %err, "could not queue image repaint");
            }
        }
    }
}

impl SampleHost for EngineState {
    fn sampler(&mut self) -> &mut SmilSampler {
        &mut self.sampler
    }

    fn sample_at(&mut self, doc_time: i64) -> SmilResult<()> {
        self.document.sample(doc_time)
    }
}

impl CanvasHost for EngineState {
    fn update_canvas(&mut self, scheduler: &dyn RepaintScheduler) -> SmilResult<()> {
        self.request_images();
        let Some(canvas) = self.canvas.as_mut() else {
            return Ok(());
        };
        canvas.update_canvas(
            self.document.scene_mut(),
            &self.images as &dyn ImageResolver,
            scheduler,
        )?;
        Ok(())
    }
}

fn repaint_after_task(state: &mut EngineState) {
    let Some(queue) = state.queue.clone() else {
        return;
    };
    if let Err(err) = state.update_canvas(&queue) {
        tracing::error!(error = %err, "canvas update failed");
    }
}

/// A document playing on its own update thread.
///
/// Every task submitted through the player, and every sample tick, is
/// followed by a canvas update, so changes reach the screen without the
/// caller asking for a repaint.
pub struct Player {
    queue: UpdateQueue<EngineState>,
    animator: Animator<EngineState>,
    consumer: Option<CanvasConsumer>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("queue", &self.queue)
            .field("animator", &self.animator)
            .finish()
    }
}

impl Player {
    /// Starts the update thread. Without `graphics` the document is sampled
    /// but never painted.
    #[tracing::instrument(skip_all)]
    pub fn start(
        document: Document,
        graphics: Option<Box<dyn RenderGraphics>>,
        images: ImageLoader,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> SmilResult<Self> {
        config.validate()?;
        let canvas = graphics
            .map(|g| {
                SimpleCanvasManager::new(g, config.tile_min_size, config.dirty_areas, config.clear_color())
            })
            .transpose()?;
        let consumer = canvas.as_ref().map(SimpleCanvasManager::consumer);

        let mut sampler = SmilSampler::new(clock);
        sampler.set_time_increment(config.time_increment_ms);
        let state = EngineState {
            document,
            sampler,
            canvas,
            images,
            queue: None,
        };

        let handler: RunHandler<EngineState> = Arc::new(repaint_after_task);
        let queue = UpdateQueue::start("tinysmil-update", state, Some(handler))?;
        let own = queue.clone();
        queue.invoke_later(move |s: &mut EngineState| s.queue = Some(own))?;
        queue.resume()?;
        let animator = Animator::new(queue.clone(), config.frame_interval())?;
        Ok(Self {
            queue,
            animator,
            consumer,
        })
    }

    pub fn queue(&self) -> &UpdateQueue<EngineState> {
        &self.queue
    }

    /// Display-side frame handle. `None` for a headless player.
    pub fn consumer(&self) -> Option<&CanvasConsumer> {
        self.consumer.as_ref()
    }

    pub fn state(&self) -> AnimatorState {
        self.animator.state()
    }

    pub fn play(&self) -> SmilResult<()> {
        self.animator.play()
    }

    pub fn pause(&self) -> SmilResult<()> {
        self.animator.pause()
    }

    pub fn stop(&self) -> SmilResult<()> {
        self.animator.stop()
    }

    pub fn set_time_increment(&self, increment: Option<i64>) -> SmilResult<()> {
        self.animator.set_time_increment(increment)
    }

    pub fn set_frame_interval(&self, interval: std::time::Duration) -> SmilResult<()> {
        self.animator.set_frame_interval(interval)
    }

    /// Moves document time to `t` and samples there, playing or not.
    pub fn seek(&self, t: i64) -> SmilResult<()> {
        self.queue.invoke_and_wait(move |s: &mut EngineState| {
            s.sampler.seek(t);
            s.document.seek(t)
        })?
    }

    /// Current document time as seen by the sampler.
    pub fn current_time(&self) -> SmilResult<i64> {
        self.queue.invoke_and_wait(|s: &mut EngineState| s.current_time())
    }

    /// Script-style trait write. Returns whether the value changed.
    pub fn set_trait(&self, node: NodeId, trait_id: TraitId, value: AnimValue) -> SmilResult<bool> {
        self.queue.invoke_and_wait(move |s: &mut EngineState| {
            s.document.scene_mut().set_trait(node, trait_id, value)
        })?
    }

    pub fn get_trait(&self, node: NodeId, trait_id: TraitId) -> SmilResult<AnimValue> {
        self.queue
            .invoke_and_wait(move |s: &mut EngineState| s.document.scene().get_trait(node, trait_id))?
    }

    /// Delivers `event` on the element with id `source` at the current
    /// document time.
    pub fn dispatch_event(&self, source: &str, event: &str) -> SmilResult<bool> {
        let (source, event) = (source.to_owned(), event.to_owned());
        self.queue.invoke_and_wait(move |s: &mut EngineState| {
            let t = s.current_time();
            s.document.dispatch_event(&source, &event, t)
        })?
    }

    /// Hit-tests a device-space point and delivers `click` on what it hits.
    pub fn click(&self, point: Point) -> SmilResult<bool> {
        self.queue.invoke_and_wait(move |s: &mut EngineState| {
            let t = s.current_time();
            s.document.dispatch_pointer(point, "click", t)
        })?
    }

    /// Runs `f` against the engine state on the update thread.
    pub fn with_state<R, F>(&self, f: F) -> SmilResult<R>
    where
        F: FnOnce(&mut EngineState) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.queue.invoke_and_wait(f)
    }

    /// Stops the sampler and the update thread. Queued tasks are dropped.
    pub fn shutdown(&self) -> SmilResult<()> {
        let stopped = self.animator.stop();
        self.queue.shutdown();
        match stopped {
            Ok(()) | Err(SmilError::QueueStopped) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.queue.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runtime/player.rs"]
mod tests;
