use std::collections::{BTreeMap, HashMap};

use crate::{
    animation::{
        animate::{Animation, AnimationDef, SimpleTime},
        sandwich::{AnimationSource, TraitAnim},
    },
    foundation::{
        core::{AnimationId, NodeId, Point, TimedId, Viewport},
        error::{SmilError, SmilResult},
    },
    model::{scene::SceneModel, traits::TraitId},
    timing::{
        condition::parse_time_conditions,
        element::{FillBehavior, TimingAttributes},
        event::{TimingEvent, TimingEventKind},
        graph::TimingGraph,
        time::Time,
    },
};

/// An animation element before it is added to a [`Document`].
#[derive(Clone, Debug)]
pub struct AnimationElement {
    pub label: Option<String>,
    pub target: NodeId,
    pub trait_id: TraitId,
    pub def: AnimationDef,
    pub timing: TimingAttributes,
    /// `begin` attribute; empty means `0s`.
    pub begin: String,
    /// `end` attribute; empty means none.
    pub end: String,
}

impl AnimationElement {
    pub fn new(target: NodeId, trait_id: TraitId, def: AnimationDef) -> Self {
        Self {
            label: None,
            target,
            trait_id,
            def,
            timing: TimingAttributes::default(),
            begin: String::new(),
            end: String::new(),
        }
    }
}

#[derive(Debug)]
struct AnimationEntry {
    timed: TimedId,
    target: NodeId,
    trait_id: TraitId,
    animation: Option<Animation>,
}

/// Sample positions of every animation, read from the timing graph.
struct Sampled<'a> {
    animations: &'a [AnimationEntry],
    timing: &'a TimingGraph,
}

impl AnimationSource for Sampled<'_> {
    fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(id.index())?.animation.as_ref()
    }

    fn simple_time(&self, id: AnimationId) -> Option<SimpleTime> {
        let timed = self.animations.get(id.index())?.timed;
        let time = self.timing.local_time(timed)?;
        let support = self.timing.support(timed).ok()?;
        Some(SimpleTime {
            time,
            simple_dur: support.simple_duration(),
            iteration: support.current_iteration(),
        })
    }
}

/// A scene, its timing tree and the animations that connect them.
///
/// A sample advances the timing graph, moves animations in and out of their
/// trait sandwiches according to the emitted events, then writes every
/// active sandwich's value back through [`SceneModel::set_trait`].
#[derive(Debug)]
pub struct Document {
    scene: SceneModel,
    timing: TimingGraph,
    animations: Vec<AnimationEntry>,
    by_timed: HashMap<TimedId, AnimationId>,
    sandwiches: BTreeMap<(NodeId, TraitId), TraitAnim>,
}

impl Document {
    pub fn new(viewport: Viewport) -> Self {
        Self::from_scene(SceneModel::new(viewport))
    }

    pub fn from_scene(scene: SceneModel) -> Self {
        Self {
            scene,
            timing: TimingGraph::new(),
            animations: Vec::new(),
            by_timed: HashMap::new(),
            sandwiches: BTreeMap::new(),
        }
    }

    pub fn scene(&self) -> &SceneModel {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneModel {
        &mut self.scene
    }

    pub fn timing(&self) -> &TimingGraph {
        &self.timing
    }

    pub fn timing_mut(&mut self) -> &mut TimingGraph {
        &mut self.timing
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// Timed element driving animation `id`.
    pub fn animation_timed(&self, id: AnimationId) -> Option<TimedId> {
        self.animations.get(id.index()).map(|e| e.timed)
    }

    /// Animations currently in the sandwich of `trait_id` on `node`,
    /// lowest priority first.
    pub fn active_animations(&self, node: NodeId, trait_id: TraitId) -> &[AnimationId] {
        self.sandwiches
            .get(&(node, trait_id))
            .map(TraitAnim::active)
            .unwrap_or(&[])
    }

    /// Adds an animation under time container `container`. Document order,
    /// and therefore sandwich priority, is the order of these calls.
    pub fn add_animation(
        &mut self,
        container: TimedId,
        element: AnimationElement,
    ) -> SmilResult<AnimationId> {
        let kind = self.scene.kind(element.target)?;
        if !kind.supports(element.trait_id) {
            return Err(SmilError::structure(format!(
                "{kind:?} cannot animate '{}'",
                element.trait_id
            )));
        }
        let animation = Animation::compile(&element.def, element.trait_id.target())?;
        let begin = parse_time_conditions(&element.begin, true)?;
        let end = parse_time_conditions(&element.end, false)?;

        let timed = self
            .timing
            .add_element(container, element.label.as_deref(), element.timing)?;
        let base = self.scene.element_id(element.target).map(str::to_owned);
        self.timing.set_event_base(timed, base)?;
        for cond in begin {
            self.timing.add_condition(timed, true, cond)?;
        }
        for cond in end {
            self.timing.add_condition(timed, false, cond)?;
        }

        let id = AnimationId(u32::try_from(self.animations.len()).map_err(|_| {
            SmilError::structure("too many animations in one document")
        })?);
        if animation.is_none() {
            tracing::debug!(?id, "animation has no values and will have no effect");
        }
        self.animations.push(AnimationEntry {
            timed,
            target: element.target,
            trait_id: element.trait_id,
            animation,
        });
        self.by_timed.insert(timed, id);
        Ok(id)
    }

    /// Samples the document at root time `t` (ms). Errors from individual
    /// elements and traits are logged and the first one is returned once
    /// everything else has been sampled.
    #[tracing::instrument(skip(self))]
    pub fn sample(&mut self, t: i64) -> SmilResult<()> {
        let timing = self.timing.sample(t);
        self.finish_sample(timing)
    }

    /// Jumps to root time `t`, emitting seek events.
    #[tracing::instrument(skip(self))]
    pub fn seek(&mut self, t: i64) -> SmilResult<()> {
        let timing = self.timing.seek_to(t);
        self.finish_sample(timing)
    }

    fn finish_sample(&mut self, timing: SmilResult<()>) -> SmilResult<()> {
        let events = self.timing.take_events();
        let routed = self.route_events(&events);
        let applied = self.apply_animations();
        timing.and(routed).and(applied)
    }

    /// Delivers a DOM-style event (`click`, `activate`, ...) on the element
    /// with id `source`. Takes effect at the next sample.
    pub fn dispatch_event(&mut self, source: &str, event: &str, root_time: i64) -> SmilResult<bool> {
        self.timing.dispatch_event(source, event, Time::ms(root_time))
    }

    /// Hit-tests `point` and dispatches `event` on the topmost node with an
    /// element id. Returns `false` when nothing was hit.
    pub fn dispatch_pointer(&mut self, point: Point, event: &str, root_time: i64) -> SmilResult<bool> {
        let Some(source) = self
            .scene
            .hit_test(point)
            .and_then(|n| self.scene.element_id(n))
            .map(str::to_owned)
        else {
            return Ok(false);
        };
        self.dispatch_event(&source, event, root_time)
    }

    pub fn dispatch_access_key(&mut self, key: char, root_time: i64) -> SmilResult<bool> {
        self.timing.dispatch_access_key(key, Time::ms(root_time))
    }

    fn route_events(&mut self, events: &[TimingEvent]) -> SmilResult<()> {
        let mut first_error = None;
        for ev in events {
            let Some(&id) = self.by_timed.get(&ev.element) else {
                continue;
            };
            let result = match ev.kind {
                TimingEventKind::Begin | TimingEventKind::SeekBegin => self.insert_into_sandwich(id),
                TimingEventKind::LastDurEnd => {
                    match self.timing.support(ev.element).map(|s| s.attributes().fill) {
                        Ok(FillBehavior::Remove) => self.remove_from_sandwich(id),
                        Ok(FillBehavior::Freeze) => Ok(()),
                        Err(err) => Err(err),
                    }
                }
                TimingEventKind::SeekEnd => self.remove_from_sandwich(id),
                TimingEventKind::End | TimingEventKind::Repeat(_) => Ok(()),
            };
            if let Err(err) = result {
                tracing::error!(animation = ?id, error = %err, "sandwich update failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn insert_into_sandwich(&mut self, id: AnimationId) -> SmilResult<()> {
        let entry = &self.animations[id.index()];
        if entry.animation.is_none() {
            return Ok(());
        }
        let (node, trait_id) = (entry.target, entry.trait_id);
        let specified = self.scene.get_trait(node, trait_id)?;
        let added = self
            .sandwiches
            .entry((node, trait_id))
            .or_insert_with(|| TraitAnim::new(trait_id.kind()))
            .add_animation(id, || specified);
        if added {
            tracing::debug!(?id, ?node, %trait_id, "animation entered sandwich");
        }
        Ok(())
    }

    fn remove_from_sandwich(&mut self, id: AnimationId) -> SmilResult<()> {
        let entry = &self.animations[id.index()];
        let key = (entry.target, entry.trait_id);
        let Some(sandwich) = self.sandwiches.get_mut(&key) else {
            return Ok(());
        };
        let Some(specified) = sandwich.remove_animation(id) else {
            return Ok(());
        };
        self.sandwiches.remove(&key);
        tracing::debug!(?id, node = ?key.0, trait_id = %key.1, "sandwich emptied, restoring");
        self.scene.set_trait(key.0, key.1, specified)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn apply_animations(&mut self) -> SmilResult<()> {
        let source = Sampled {
            animations: &self.animations,
            timing: &self.timing,
        };
        let mut first_error = None;
        for (&(node, trait_id), sandwich) in &self.sandwiches {
            let result = sandwich.compute(&source).and_then(|value| match value {
                Some(v) => self.scene.set_trait(node, trait_id, v).map(|_| ()),
                None => Ok(()),
            });
            if let Err(err) = result {
                tracing::error!(?node, %trait_id, error = %err, "applying animation failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/document.rs"]
mod tests;
