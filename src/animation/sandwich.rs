use crate::{
    animation::{
        animate::{Animation, SimpleTime},
        value::{AnimValue, TraitKind},
    },
    foundation::{
        core::AnimationId,
        error::{SmilError, SmilResult},
    },
};

/// Read access to compiled animations and their current sample positions.
pub trait AnimationSource {
    fn animation(&self, id: AnimationId) -> Option<&Animation>;

    /// `None` when the animation's element has no current interval, in which
    /// case it contributes nothing and its underlying value shows through.
    fn simple_time(&self, id: AnimationId) -> Option<SimpleTime>;
}

/// The animation sandwich of one trait on one element.
///
/// Active animations are kept in priority order, lowest first. Priority is
/// document order, which [`AnimationId`] encodes. The trait's specified value
/// is captured when the first animation is added and handed back when the
/// last one is removed, so the caller can restore it.
#[derive(Clone, Debug)]
pub struct TraitAnim {
    kind: TraitKind,
    active: Vec<AnimationId>,
    specified: Option<AnimValue>,
}

impl TraitAnim {
    pub fn new(kind: TraitKind) -> Self {
        Self {
            kind,
            active: Vec::new(),
            specified: None,
        }
    }

    pub fn kind(&self) -> TraitKind {
        self.kind
    }

    /// Inserts `id` by priority. `specified` is read only when the sandwich
    /// was empty. Returns `false` if `id` was already active.
    pub fn add_animation<F>(&mut self, id: AnimationId, specified: F) -> bool
    where
        F: FnOnce() -> AnimValue,
    {
        match self.active.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                if self.active.is_empty() {
                    self.specified = Some(specified());
                }
                self.active.insert(pos, id);
                true
            }
        }
    }

    /// Removes `id`. When this empties the sandwich, returns the specified
    /// value captured on first add.
    pub fn remove_animation(&mut self, id: AnimationId) -> Option<AnimValue> {
        let pos = self.active.binary_search(&id).ok()?;
        self.active.remove(pos);
        if self.active.is_empty() {
            self.specified.take()
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Active animations, lowest priority first.
    pub fn active(&self) -> &[AnimationId] {
        &self.active
    }

    /// Highest-priority animation, whose value is the presentation value.
    pub fn root_animation(&self) -> Option<AnimationId> {
        self.active.last().copied()
    }

    pub fn specified_value(&self) -> Option<&AnimValue> {
        self.specified.as_ref()
    }

    /// Presentation value of the trait, or `None` for an empty sandwich.
    pub fn compute<S: AnimationSource + ?Sized>(&self, source: &S) -> SmilResult<Option<AnimValue>> {
        if self.active.is_empty() {
            return Ok(None);
        }
        self.compute_level(self.active.len() - 1, source).map(Some)
    }

    fn compute_level<S: AnimationSource + ?Sized>(
        &self,
        level: usize,
        source: &S,
    ) -> SmilResult<AnimValue> {
        let id = self.active[level];
        let anim = source
            .animation(id)
            .ok_or_else(|| SmilError::structure(format!("unknown animation {id:?} in sandwich")))?;
        match source.simple_time(id) {
            Some(at) => anim.value_at(at, || self.underlying(level, source)),
            None => self.underlying(level, source),
        }
    }

    fn underlying<S: AnimationSource + ?Sized>(&self, level: usize, source: &S) -> SmilResult<AnimValue> {
        if level == 0 {
            self.specified
                .clone()
                .ok_or_else(|| SmilError::structure("sandwich has no specified value"))
        } else {
            self.compute_level(level - 1, source)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/sandwich.rs"]
mod tests;
