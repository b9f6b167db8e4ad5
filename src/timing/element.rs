use crate::{
    foundation::error::{SmilError, SmilResult},
    timing::{
        condition::TimeCondition,
        instance::{TimeInstance, time_after, time_after_strict},
        interval::{IntervalBounds, IntervalId},
        time::Time,
    },
};

/// `restart` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restart {
    #[default]
    Always,
    WhenNotActive,
    Never,
}

/// `fill` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillBehavior {
    #[default]
    Remove,
    Freeze,
}

/// Per-element timing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingState {
    PreInit,
    NoInterval,
    WaitingFirst,
    WaitingNext,
    Playing,
    Fill,
}

/// Timing attributes of one element. Only settable before initialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingAttributes {
    pub dur: Time,
    /// `None` when unspecified. `f32::INFINITY` encodes `indefinite`.
    pub repeat_count: Option<f32>,
    pub repeat_dur: Option<Time>,
    pub min: Time,
    pub max: Time,
    pub restart: Restart,
    pub fill: FillBehavior,
}

impl Default for TimingAttributes {
    fn default() -> Self {
        Self {
            dur: Time::Indefinite,
            repeat_count: None,
            repeat_dur: None,
            min: Time::ZERO,
            max: Time::Indefinite,
            restart: Restart::Always,
            fill: FillBehavior::Remove,
        }
    }
}

impl TimingAttributes {
    pub fn validate(&self) -> SmilResult<()> {
        if let Some(rc) = self.repeat_count
            && !(rc > 0.0)
        {
            return Err(SmilError::validation(format!(
                "repeatCount must be > 0, got {rc}"
            )));
        }
        if let Time::Resolved(d) = self.dur
            && d < 0
        {
            return Err(SmilError::validation("dur must be >= 0"));
        }
        if self.min == Time::Unresolved || self.max == Time::Unresolved {
            return Err(SmilError::validation("min/max must be resolved or indefinite"));
        }
        Ok(())
    }
}

/// Timing state machine data of one element.
///
/// Interval arithmetic that only depends on the element's own instance lists
/// lives here; anything touching other elements lives on the graph.
#[derive(Clone, Debug)]
pub struct TimedElementSupport {
    pub(crate) attrs: TimingAttributes,
    pub(crate) state: TimingState,
    pub(crate) play_fill: bool,
    pub(crate) cur_iter: u32,
    pub(crate) simple_dur: Time,
    pub(crate) current: Option<IntervalId>,
    pub(crate) previous: Option<IntervalId>,
    pub(crate) begin_instances: Vec<TimeInstance>,
    pub(crate) end_instances: Vec<TimeInstance>,
    pub(crate) begin_conditions: Vec<TimeCondition>,
    pub(crate) end_conditions: Vec<TimeCondition>,
    pub(crate) last_sample: Option<i64>,
    pub(crate) timing_update: bool,
}

impl TimedElementSupport {
    pub fn new(attrs: TimingAttributes) -> SmilResult<Self> {
        attrs.validate()?;
        Ok(Self::with_attributes(attrs))
    }

    pub(crate) fn with_attributes(attrs: TimingAttributes) -> Self {
        Self {
            attrs,
            state: TimingState::PreInit,
            play_fill: false,
            cur_iter: 0,
            simple_dur: Time::Unresolved,
            current: None,
            previous: None,
            begin_instances: Vec::new(),
            end_instances: Vec::new(),
            begin_conditions: Vec::new(),
            end_conditions: Vec::new(),
            last_sample: None,
            timing_update: false,
        }
    }

    pub fn attributes(&self) -> &TimingAttributes {
        &self.attrs
    }

    pub fn state(&self) -> TimingState {
        self.state
    }

    pub fn current_iteration(&self) -> u32 {
        self.cur_iter
    }

    pub fn simple_duration(&self) -> Time {
        self.simple_dur
    }

    /// Local simple time of the last sample that produced one.
    pub fn last_sample_time(&self) -> Option<i64> {
        self.last_sample
    }

    pub fn begin_instances(&self) -> &[TimeInstance] {
        &self.begin_instances
    }

    pub fn end_instances(&self) -> &[TimeInstance] {
        &self.end_instances
    }

    pub(crate) fn check_pre_init(&self) -> SmilResult<()> {
        if self.state != TimingState::PreInit {
            return Err(SmilError::structure(
                "timing attributes can only change before initialization",
            ));
        }
        Ok(())
    }

    pub(crate) fn set_attributes(&mut self, attrs: TimingAttributes) -> SmilResult<()> {
        self.check_pre_init()?;
        attrs.validate()?;
        self.attrs = attrs;
        Ok(())
    }

    fn end_has_event_conditions(&self) -> bool {
        self.end_conditions.iter().any(TimeCondition::is_event_based)
    }

    pub(crate) fn compute_simple_duration(&self) -> Time {
        self.attrs.dur
    }

    /// Repeat-adjusted duration before min/max clamping.
    pub(crate) fn intermediate_active_duration(&self, p0: Time) -> Time {
        if p0 == Time::ZERO {
            return Time::ZERO;
        }
        if self.attrs.repeat_dur.is_none() && self.attrs.repeat_count.is_none() {
            return p0;
        }
        let p1 = match (self.attrs.repeat_count, p0) {
            (None, _) => Time::Indefinite,
            (Some(rc), _) if rc.is_infinite() => Time::Indefinite,
            (Some(rc), Time::Resolved(v)) => Time::Resolved((v as f64 * f64::from(rc)) as i64),
            (Some(_), other) => other,
        };
        let p2 = self.attrs.repeat_dur.unwrap_or(Time::Indefinite);
        p1.min(p2).min(Time::Indefinite)
    }

    /// Active end for an interval starting at `begin`, given the end instance
    /// chosen for it (`None` when the element has no end conditions).
    pub(crate) fn calculate_active_end(&self, begin: Time, end: Option<Time>) -> SmilResult<Time> {
        let Time::Resolved(begin_ms) = begin else {
            return Err(SmilError::structure(format!(
                "active end needs a resolved begin, got {begin}"
            )));
        };
        let iad = self.intermediate_active_duration(self.compute_simple_duration());
        let pad = match end {
            None | Some(Time::Indefinite) => iad,
            Some(end) => {
                let pad2 = match end {
                    Time::Resolved(e) => Time::Resolved(e - begin_ms),
                    _ => Time::Unresolved,
                };
                iad.min(pad2)
            }
        };

        let (min, max) = (self.attrs.min, self.attrs.max);
        let mut ad = pad;
        if max >= min {
            if min >= ad {
                ad = min;
            }
            if ad > max {
                ad = max;
            }
        }

        let mut ad = ad.offset_by(begin_ms);
        if self.attrs.restart == Restart::Always
            && let Some(restart_begin) = time_after_strict(begin, &self.begin_instances)
            && ad >= restart_begin
            && restart_begin.is_resolved()
        {
            ad = restart_begin;
        }
        Ok(ad)
    }

    pub(crate) fn compute_last_dur(&self, begin: Time, end: Time) -> IntervalBounds {
        let iad = self.intermediate_active_duration(self.compute_simple_duration());
        let last_dur = match (begin, iad) {
            (Time::Resolved(b), Time::Resolved(d)) => Time::Resolved(b + d).min(end),
            _ => end,
        };
        IntervalBounds {
            begin,
            end,
            last_dur,
        }
    }

    /// End chosen from the end list for an interval beginning at `begin`, or
    /// `Err(())` when the end list rules out any interval.
    fn end_for_begin(&self, begin: Time, reference: Time) -> Result<Option<Time>, ()> {
        let mut end = time_after(begin, &self.end_instances);
        if end.is_some_and(|e| reference.is_same_time(e)) {
            end = end.and_then(|e| time_after_strict(e, &self.end_instances));
        }
        match end {
            Some(e) => Ok(Some(e)),
            None if self.end_has_event_conditions() || self.end_instances.is_empty() => {
                Ok(Some(Time::Unresolved))
            }
            None => Err(()),
        }
    }

    pub(crate) fn compute_first_interval(
        &self,
        container_simple_dur: Time,
    ) -> SmilResult<Option<IntervalBounds>> {
        let mut lower = Time::ms(i64::MIN);
        let mut strict_after: Option<Time> = None;
        loop {
            let candidate = self.begin_instances.iter().map(|i| i.time).find(|t| {
                t.greater_than(lower) && strict_after.is_none_or(|s| *t > s)
            });
            let Some(begin) = candidate else {
                return Ok(None);
            };
            if begin.greater_than(container_simple_dur) || !begin.is_resolved() {
                return Ok(None);
            }
            let end = if self.end_conditions.is_empty() {
                self.calculate_active_end(begin, None)?
            } else {
                match self.end_for_begin(begin, begin) {
                    Ok(end) => self.calculate_active_end(begin, end)?,
                    Err(()) => return Ok(None),
                }
            };
            match end {
                Time::Resolved(e) if e <= 0 => {
                    lower = end;
                    strict_after = Some(begin);
                }
                _ => return Ok(Some(self.compute_last_dur(begin, end))),
            }
        }
    }

    pub(crate) fn compute_next_interval(
        &self,
        previous: IntervalBounds,
        container_simple_dur: Time,
    ) -> SmilResult<Option<IntervalBounds>> {
        let prev_end = previous.end;
        let begin = if previous.begin.is_same_time(prev_end) {
            time_after_strict(prev_end, &self.begin_instances)
        } else {
            time_after(prev_end, &self.begin_instances)
        };
        let Some(begin) = begin else {
            return Ok(None);
        };
        if begin.greater_than(container_simple_dur) || !begin.is_resolved() {
            return Ok(None);
        }
        let end = if self.end_conditions.is_empty() {
            let mut end = self.calculate_active_end(begin, None)?;
            if let Some(e2) = time_after(begin, &self.end_instances)
                && e2.is_resolved()
            {
                end = e2;
            }
            end
        } else {
            match self.end_for_begin(begin, prev_end) {
                Ok(end) => self.calculate_active_end(begin, end)?,
                Err(()) => return Ok(None),
            }
        };
        Ok(Some(self.compute_last_dur(begin, end)))
    }

    /// Recomputes the end of an interval that already began at `begin`.
    pub(crate) fn compute_end_time(&self, begin: Time) -> SmilResult<Option<Time>> {
        if self.end_instances.is_empty() {
            return self.calculate_active_end(begin, None).map(Some);
        }
        let mut end = time_after(begin, &self.end_instances);
        if let Some(e) = end
            && begin.is_same_time(e)
        {
            end = time_after(e.offset_by(1), &self.end_instances);
        }
        let end = match end {
            Some(e) => e,
            None if self.end_has_event_conditions() => Time::Unresolved,
            None => return Ok(None),
        };
        self.calculate_active_end(begin, Some(end)).map(Some)
    }

    /// Local simple time for `current`, or `None` when nothing should be sampled.
    pub(crate) fn local_time(
        &self,
        current: Time,
        interval: Option<IntervalBounds>,
        previous: Option<IntervalBounds>,
    ) -> Option<i64> {
        let local = match self.state {
            TimingState::WaitingNext | TimingState::Fill => {
                if self.attrs.fill != FillBehavior::Freeze {
                    return None;
                }
                let prev = previous?;
                prev.last_dur.value()? - prev.begin.value()?
            }
            TimingState::Playing => {
                let cur = interval?;
                if !self.play_fill {
                    current.value()? - cur.begin.value()?
                } else {
                    cur.last_dur.value()? - cur.begin.value()?
                }
            }
            _ => return None,
        };
        let mut local = local;
        if let Time::Resolved(sd) = self.simple_dur
            && sd > 0
        {
            local %= sd;
            if (self.state != TimingState::Playing || self.play_fill) && local == 0 {
                local = sd;
            }
        }
        Some(local)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/element.rs"]
mod tests;
