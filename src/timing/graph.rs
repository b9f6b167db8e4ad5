use std::collections::HashMap;

use crate::{
    foundation::{
        core::TimedId,
        error::{SmilError, SmilResult},
    },
    timing::{
        condition::TimeCondition,
        element::{Restart, TimedElementSupport, TimingAttributes, TimingState},
        event::{TimingEvent, TimingEventKind},
        instance::{InstanceId, SyncLink, TimeInstance, insert_sorted},
        interval::{Dependent, IntervalBounds, IntervalId, IntervalStore, TimeInterval},
        time::Time,
    },
};

/// Upper bound on re-sampling passes used to settle event-based instances
/// created during a sample.
const MAX_SETTLE_PASSES: usize = 8;

/// Upper bound on `Repeat` events emitted by one sample for one element.
const MAX_REPEAT_EVENTS: u32 = 1024;

#[derive(Clone, Copy, Debug)]
struct SyncDependent {
    element: TimedId,
    is_begin: bool,
    offset: i64,
}

#[derive(Debug)]
struct TimedNode {
    support: TimedElementSupport,
    container: Option<TimedId>,
    children: Vec<TimedId>,
    is_container: bool,
    speed: f64,
    simple_time: Time, // time seen by children (containers only)
    label: Option<String>,
    event_base: Option<String>,
    begin_dependents: Vec<SyncDependent>, // instances synced on our begin
    end_dependents: Vec<SyncDependent>,   // instances synced on our end
    sync_bases: Vec<TimedId>,
}

/// Arena of timed elements and their time containers.
///
/// Element 0 is the root container. Sync-base links, interval dependents and
/// container membership are all plain ids into this arena.
#[derive(Debug)]
pub struct TimingGraph {
    nodes: Vec<TimedNode>,
    labels: HashMap<String, TimedId>,
    intervals: IntervalStore,
    next_instance: u32,
    pending: Vec<TimingEvent>,
    emitted: Vec<TimingEvent>,
    last_sample_time: Option<i64>,
    seeking_back: bool,
    initialized: bool,
}

impl Default for TimingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingGraph {
    pub fn new() -> Self {
        let root = TimedNode {
            support: TimedElementSupport::with_attributes(TimingAttributes::default()),
            container: None,
            children: Vec::new(),
            is_container: true,
            speed: 1.0,
            simple_time: Time::Unresolved,
            label: None,
            event_base: None,
            begin_dependents: Vec::new(),
            end_dependents: Vec::new(),
            sync_bases: Vec::new(),
        };
        Self {
            nodes: vec![root],
            labels: HashMap::new(),
            intervals: IntervalStore::default(),
            next_instance: 0,
            pending: Vec::new(),
            emitted: Vec::new(),
            last_sample_time: None,
            seeking_back: false,
            initialized: false,
        }
    }

    pub fn root(&self) -> TimedId {
        TimedId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Adds a leaf timed element (an animation) under `container`.
    pub fn add_element(
        &mut self,
        container: TimedId,
        label: Option<&str>,
        attrs: TimingAttributes,
    ) -> SmilResult<TimedId> {
        self.add_node(container, label, attrs, false, 1.0)
    }

    /// Adds a nested time container. `speed` scales the time its children see.
    pub fn add_container(
        &mut self,
        container: TimedId,
        label: Option<&str>,
        attrs: TimingAttributes,
        speed: f64,
    ) -> SmilResult<TimedId> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(SmilError::validation(format!(
                "container speed must be > 0, got {speed}"
            )));
        }
        self.add_node(container, label, attrs, true, speed)
    }

    fn add_node(
        &mut self,
        container: TimedId,
        label: Option<&str>,
        attrs: TimingAttributes,
        is_container: bool,
        speed: f64,
    ) -> SmilResult<TimedId> {
        if self.initialized {
            return Err(SmilError::structure(
                "timed elements must be added before initialization",
            ));
        }
        if !self.node(container)?.is_container {
            return Err(SmilError::structure(format!(
                "element {container:?} is not a time container"
            )));
        }
        let id = TimedId(self.nodes.len() as u32);
        if let Some(label) = label {
            if self.labels.contains_key(label) {
                return Err(SmilError::structure(format!(
                    "duplicate timed element id '{label}'"
                )));
            }
            self.labels.insert(label.to_owned(), id);
        }
        self.nodes.push(TimedNode {
            support: TimedElementSupport::new(attrs)?,
            container: Some(container),
            children: Vec::new(),
            is_container,
            speed,
            simple_time: Time::Unresolved,
            label: label.map(str::to_owned),
            event_base: None,
            begin_dependents: Vec::new(),
            end_dependents: Vec::new(),
            sync_bases: Vec::new(),
        });
        self.nodes[container.index()].children.push(id);
        Ok(id)
    }

    pub fn lookup(&self, label: &str) -> Option<TimedId> {
        self.labels.get(label).copied()
    }

    pub fn label(&self, id: TimedId) -> Option<&str> {
        self.nodes.get(id.index()).and_then(|n| n.label.as_deref())
    }

    /// Default event base for conditions such as `begin="click"`.
    pub fn set_event_base(&mut self, id: TimedId, base: Option<String>) -> SmilResult<()> {
        self.node_mut(id)?.event_base = base;
        Ok(())
    }

    pub fn set_attributes(&mut self, id: TimedId, attrs: TimingAttributes) -> SmilResult<()> {
        self.node_mut(id)?.support.set_attributes(attrs)
    }

    /// Declares a begin or end condition. Offset conditions create their
    /// instance right away; sync-base links resolve in [`Self::initialize`].
    pub fn add_condition(
        &mut self,
        id: TimedId,
        is_begin: bool,
        condition: TimeCondition,
    ) -> SmilResult<()> {
        if self.initialized {
            return Err(SmilError::structure(
                "time conditions must be declared before initialization",
            ));
        }
        let node = self.node_mut(id)?;
        node.support.check_pre_init()?;
        if let TimeCondition::Offset { offset } = condition {
            let instance = TimeInstance {
                id: self.alloc_instance_id(),
                time: Time::ms(offset),
                is_begin,
                clear_on_reset: false,
                sync: None,
            };
            self.insert_instance(id, instance);
        }
        let support = &mut self.nodes[id.index()].support;
        if is_begin {
            support.begin_conditions.push(condition);
        } else {
            support.end_conditions.push(condition);
        }
        Ok(())
    }

    /// Resolves sync-base references and computes every element's first interval.
    #[tracing::instrument(skip(self))]
    pub fn initialize(&mut self) -> SmilResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.resolve_sync_bases()?;
        self.initialized = true;

        let root = self.root();
        self.reset(root)?;
        let iid = self.intervals.insert(TimeInterval {
            begin: Time::ZERO,
            end: Time::Indefinite,
            last_dur: Time::Indefinite,
            owner: root,
            dependents: Vec::new(),
        });
        let node = &mut self.nodes[0];
        node.support.current = Some(iid);
        node.support.simple_dur = Time::Indefinite;
        node.support.state = TimingState::Playing;
        node.simple_time = Time::ZERO;
        for child in self.nodes[0].children.clone() {
            self.initialize_element(child)?;
        }
        tracing::debug!(elements = self.nodes.len(), "timing graph initialized");
        Ok(())
    }

    fn resolve_sync_bases(&mut self) -> SmilResult<()> {
        for idx in 1..self.nodes.len() {
            let id = TimedId(idx as u32);
            let conditions: Vec<(bool, TimeCondition)> = {
                let s = &self.nodes[idx].support;
                s.begin_conditions
                    .iter()
                    .map(|c| (true, c.clone()))
                    .chain(s.end_conditions.iter().map(|c| (false, c.clone())))
                    .collect()
            };
            for (is_begin, condition) in conditions {
                let TimeCondition::SyncBase {
                    id: ref base_label,
                    begin: on_begin,
                    offset,
                } = condition
                else {
                    continue;
                };
                let Some(base) = self.lookup(base_label) else {
                    tracing::warn!(element = ?id, sync_base = %base_label, "unknown sync-base; condition ignored");
                    continue;
                };
                if base == id || self.sync_reachable(base, id) {
                    return Err(SmilError::structure(format!(
                        "sync-base cycle: '{}' depends on '{base_label}' which depends back on it",
                        self.nodes[idx].label.as_deref().unwrap_or("<anonymous>")
                    )));
                }
                self.nodes[idx].sync_bases.push(base);
                let dep = SyncDependent {
                    element: id,
                    is_begin,
                    offset,
                };
                let base_node = &mut self.nodes[base.index()];
                if on_begin {
                    base_node.begin_dependents.push(dep);
                } else {
                    base_node.end_dependents.push(dep);
                }
            }
        }
        Ok(())
    }

    /// `true` if `target` is reachable from `from` following sync-base edges.
    fn sync_reachable(&self, from: TimedId, target: TimedId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(cur) = stack.pop() {
            if cur == target {
                return true;
            }
            if std::mem::replace(&mut seen[cur.index()], true) {
                continue;
            }
            stack.extend(self.nodes[cur.index()].sync_bases.iter().copied());
        }
        false
    }

    /// Samples the whole tree at root time `t` (ms). Sampling earlier than the
    /// previous sample is treated as a backwards seek.
    #[tracing::instrument(skip(self))]
    pub fn sample(&mut self, t: i64) -> SmilResult<()> {
        let seeking = self.last_sample_time.is_some_and(|last| t < last);
        self.sample_root(t, seeking)
    }

    /// Jumps to root time `t`, emitting seek events instead of begin/end.
    #[tracing::instrument(skip(self))]
    pub fn seek_to(&mut self, t: i64) -> SmilResult<()> {
        self.sample_root(t, true)
    }

    fn sample_root(&mut self, t: i64, seeking: bool) -> SmilResult<()> {
        if !self.initialized {
            self.initialize()?;
        }
        self.seeking_back = seeking && self.last_sample_time.is_some_and(|last| t < last);
        let mut first_error = None;
        let mut seeking = seeking;
        for _ in 0..MAX_SETTLE_PASSES {
            self.nodes[0].simple_time = Time::ms(t);
            self.nodes[0].support.last_sample = Some(t);
            for child in self.nodes[0].children.clone() {
                if let Err(err) = self.sample_element(child, Time::ms(t), seeking) {
                    tracing::error!(element = ?child, error = %err, "sampling failed");
                    first_error.get_or_insert(err);
                }
            }
            let events = std::mem::take(&mut self.pending);
            let added = self.resolve_timing_events(&events)?;
            self.emitted.extend(events);
            if !added {
                break;
            }
            seeking = false;
            self.seeking_back = false;
        }
        self.last_sample_time = Some(t);
        self.seeking_back = false;
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn last_sample_time(&self) -> Option<i64> {
        self.last_sample_time
    }

    /// Events emitted since the last call, in emission order.
    pub fn take_events(&mut self) -> Vec<TimingEvent> {
        std::mem::take(&mut self.emitted)
    }

    /// Script-style `beginElementAt(offset)`: adds a begin instance at the
    /// container's current time plus `offset`.
    pub fn begin_element_at(&mut self, id: TimedId, offset: i64) -> SmilResult<()> {
        self.add_script_instance(id, true, offset)
    }

    /// Script-style `endElementAt(offset)`.
    pub fn end_element_at(&mut self, id: TimedId, offset: i64) -> SmilResult<()> {
        self.add_script_instance(id, false, offset)
    }

    fn add_script_instance(&mut self, id: TimedId, is_begin: bool, offset: i64) -> SmilResult<()> {
        let container = self
            .node(id)?
            .container
            .ok_or_else(|| SmilError::structure("the root container cannot be begun or ended"))?;
        let Time::Resolved(now) = self.nodes[container.index()].simple_time else {
            return Ok(());
        };
        self.add_transient_instance(id, Time::ms(now + offset), is_begin)
    }

    /// Delivers an external event (e.g. `click` on `source`) at root time
    /// `root_time`. Returns `true` if any begin/end instance was created.
    pub fn dispatch_event(&mut self, source: &str, event: &str, root_time: Time) -> SmilResult<bool> {
        self.resolve_event(source, event, None, root_time)
    }

    /// Delivers an access key press at root time `root_time`.
    pub fn dispatch_access_key(&mut self, key: char, root_time: Time) -> SmilResult<bool> {
        let mut matches = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate().skip(1) {
            let s = &node.support;
            for (is_begin, cond) in s
                .begin_conditions
                .iter()
                .map(|c| (true, c))
                .chain(s.end_conditions.iter().map(|c| (false, c)))
            {
                if let TimeCondition::AccessKey { key: k, offset } = cond
                    && *k == key
                {
                    matches.push((TimedId(idx as u32), is_begin, *offset));
                }
            }
        }
        self.add_event_instances(matches, root_time)
    }

    fn resolve_timing_events(&mut self, events: &[TimingEvent]) -> SmilResult<bool> {
        let mut added = false;
        for ev in events {
            let Some(name) = ev.kind.event_name() else {
                continue;
            };
            let Some(source) = self.nodes[ev.element.index()].label.clone() else {
                continue;
            };
            let iteration = match ev.kind {
                TimingEventKind::Repeat(n) => Some(n),
                _ => None,
            };
            added |= self.resolve_event(&source, name, iteration, ev.time)?;
        }
        Ok(added)
    }

    fn resolve_event(
        &mut self,
        source: &str,
        event: &str,
        iteration: Option<u32>,
        root_time: Time,
    ) -> SmilResult<bool> {
        let mut matches = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate().skip(1) {
            let s = &node.support;
            let default_base = node.event_base.as_deref();
            for (is_begin, cond) in s
                .begin_conditions
                .iter()
                .map(|c| (true, c))
                .chain(s.end_conditions.iter().map(|c| (false, c)))
            {
                let hit = match cond {
                    TimeCondition::Event {
                        base,
                        event: name,
                        offset,
                    } => (base.as_deref().or(default_base) == Some(source) && name == event)
                        .then_some(*offset),
                    TimeCondition::Repeat {
                        base,
                        iteration: n,
                        offset,
                    } => (base.as_deref().or(default_base) == Some(source)
                        && iteration == Some(*n))
                    .then_some(*offset),
                    _ => None,
                };
                if let Some(offset) = hit {
                    matches.push((TimedId(idx as u32), is_begin, offset));
                }
            }
        }
        self.add_event_instances(matches, root_time)
    }

    fn add_event_instances(
        &mut self,
        matches: Vec<(TimedId, bool, i64)>,
        root_time: Time,
    ) -> SmilResult<bool> {
        let mut added = false;
        for (id, is_begin, offset) in matches {
            let local = self.to_container_time(id, root_time);
            if !local.is_resolved() {
                continue;
            }
            self.add_transient_instance(id, local.offset_by(offset), is_begin)?;
            added = true;
        }
        Ok(added)
    }

    pub fn support(&self, id: TimedId) -> SmilResult<&TimedElementSupport> {
        Ok(&self.node(id)?.support)
    }

    pub fn current_interval(&self, id: TimedId) -> Option<IntervalBounds> {
        let node = self.nodes.get(id.index())?;
        node.support
            .current
            .and_then(|i| self.intervals.get(i))
            .map(TimeInterval::bounds)
    }

    pub fn previous_interval(&self, id: TimedId) -> Option<IntervalBounds> {
        let node = self.nodes.get(id.index())?;
        node.support
            .previous
            .and_then(|i| self.intervals.get(i))
            .map(TimeInterval::bounds)
    }

    pub fn interval(&self, id: IntervalId) -> Option<&TimeInterval> {
        self.intervals.get(id)
    }

    /// Number of live intervals, including the root's.
    pub fn interval_count(&self) -> usize {
        self.intervals.live_count()
    }

    /// Simple time produced by the element's most recent sample.
    pub fn local_time(&self, id: TimedId) -> Option<i64> {
        self.nodes.get(id.index())?.support.last_sample
    }

    pub fn state(&self, id: TimedId) -> Option<TimingState> {
        self.nodes.get(id.index()).map(|n| n.support.state)
    }

    pub fn is_active(&self, id: TimedId) -> bool {
        self.state(id) == Some(TimingState::Playing)
    }

    pub fn find_instance(&self, id: TimedId, instance: InstanceId) -> Option<&TimeInstance> {
        let s = &self.nodes.get(id.index())?.support;
        s.begin_instances
            .iter()
            .chain(s.end_instances.iter())
            .find(|i| i.id == instance)
    }

    /// Converts a time in `id`'s container scale to root time.
    pub fn to_root_time(&self, id: TimedId, t: Time) -> Time {
        self.to_root_impl(id, t, false)
    }

    /// Converts a root time to `id`'s container scale.
    pub fn to_container_time(&self, id: TimedId, root: Time) -> Time {
        let mut chain = Vec::new();
        let mut cur = self.nodes.get(id.index()).and_then(|n| n.container);
        while let Some(c) = cur {
            chain.push(c);
            cur = self.nodes[c.index()].container;
        }
        chain
            .iter()
            .rev()
            .fold(root, |t, c| self.lower_into_children(*c, t))
    }

    fn to_root_impl(&self, id: TimedId, t: Time, clamp: bool) -> Time {
        let mut t = t;
        let mut cur = id;
        while let Some(c) = self.nodes[cur.index()].container {
            t = self.lift_from_children(c, t, clamp);
            cur = c;
        }
        t
    }

    /// Children scale of container `c` to the scale `c` itself lives in.
    fn lift_from_children(&self, c: TimedId, t: Time, clamp: bool) -> Time {
        let node = &self.nodes[c.index()];
        let Some(iv) = node.support.current.and_then(|i| self.intervals.get(i)) else {
            return Time::Unresolved;
        };
        let Time::Resolved(v) = t else {
            return t;
        };
        let Time::Resolved(begin) = iv.begin else {
            return Time::Unresolved;
        };
        let mut v = (v as f64 / node.speed).round() as i64;
        if clamp {
            v = v.max(0);
            match (node.support.simple_dur, iv.end) {
                (Time::Resolved(sd), _) => v = v.min(sd),
                (_, Time::Resolved(end)) => v = v.min(end - begin),
                _ => {}
            }
        }
        if let Time::Resolved(sd) = node.support.simple_dur {
            v += i64::from(node.support.cur_iter) * sd;
        }
        Time::Resolved(v + begin)
    }

    fn lower_into_children(&self, c: TimedId, t: Time) -> Time {
        let node = &self.nodes[c.index()];
        let Some(iv) = node.support.current.and_then(|i| self.intervals.get(i)) else {
            return Time::Unresolved;
        };
        let Time::Resolved(mut v) = t else {
            return t;
        };
        let Time::Resolved(begin) = iv.begin else {
            return Time::Unresolved;
        };
        v -= begin;
        if let Time::Resolved(sd) = node.support.simple_dur {
            v -= i64::from(node.support.cur_iter) * sd;
        }
        Time::Resolved((v as f64 * node.speed).round() as i64)
    }

    fn container_simple_dur(&self, id: TimedId) -> Time {
        match self.nodes[id.index()].container {
            Some(c) => self.nodes[c.index()].support.simple_dur,
            None => Time::Indefinite,
        }
    }

    fn is_descendant(&self, id: TimedId, ancestor: TimedId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.nodes[c.index()].container;
        }
        false
    }

    fn node(&self, id: TimedId) -> SmilResult<&TimedNode> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| SmilError::structure(format!("unknown timed element {id:?}")))
    }

    fn node_mut(&mut self, id: TimedId) -> SmilResult<&mut TimedNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| SmilError::structure(format!("unknown timed element {id:?}")))
    }

    fn bounds_of(&self, iid: Option<IntervalId>) -> Option<IntervalBounds> {
        iid.and_then(|i| self.intervals.get(i)).map(TimeInterval::bounds)
    }

    fn emit(&mut self, element: TimedId, kind: TimingEventKind, time: Time) {
        tracing::trace!(?element, ?kind, %time, "timing event");
        self.pending.push(TimingEvent {
            element,
            kind,
            time,
        });
    }

    // ---------------------------------------------------------------------
    // Lifecycle

    fn initialize_element(&mut self, id: TimedId) -> SmilResult<()> {
        self.reset(id)?;
        let csd = self.container_simple_dur(id);
        let first = self.nodes[id.index()].support.compute_first_interval(csd)?;
        if !self.check_new_interval(id, first)? {
            self.nodes[id.index()].support.state = TimingState::NoInterval;
        }
        let node = &self.nodes[id.index()];
        if node.is_container && node.support.current.is_none() {
            for child in node.children.clone() {
                self.initialize_element(child)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self, id: TimedId) -> SmilResult<()> {
        let (current, previous) = {
            let s = &mut self.nodes[id.index()].support;
            (s.current.take(), s.previous.take())
        };
        for iid in [current, previous].into_iter().flatten() {
            self.prune_interval(iid)?;
        }
        {
            let s = &mut self.nodes[id.index()].support;
            s.simple_dur = Time::Unresolved;
            s.cur_iter = 0;
            s.state = TimingState::PreInit;
            s.play_fill = false;
            s.last_sample = None;
            s.begin_instances.retain(|i| !i.clear_on_reset);
            s.end_instances.retain(|i| !i.clear_on_reset);
        }
        self.resync_instances(id);

        if self.nodes[id.index()].is_container {
            for child in self.nodes[id.index()].children.clone() {
                self.remove_sync_base_times_under(child, id)?;
            }
        }
        Ok(())
    }

    fn resync_instances(&mut self, id: TimedId) {
        let mut begin = std::mem::take(&mut self.nodes[id.index()].support.begin_instances);
        let mut end = std::mem::take(&mut self.nodes[id.index()].support.end_instances);
        for inst in begin.iter_mut().chain(end.iter_mut()) {
            if let Some(link) = inst.sync {
                inst.time = self.sync_time(&link, id);
            }
        }
        begin.sort_by(|a, b| a.time.cmp(&b.time));
        end.sort_by(|a, b| a.time.cmp(&b.time));
        let s = &mut self.nodes[id.index()].support;
        s.begin_instances = begin;
        s.end_instances = end;
    }

    fn remove_sync_base_times_under(&mut self, id: TimedId, container: TimedId) -> SmilResult<()> {
        let doomed: Vec<(InstanceId, bool)> = {
            let s = &self.nodes[id.index()].support;
            s.begin_instances
                .iter()
                .chain(s.end_instances.iter())
                .filter(|i| {
                    i.sync
                        .is_some_and(|l| self.is_descendant(l.sync_base, container))
                })
                .map(|i| (i.id, i.is_begin))
                .collect()
        };
        for (inst, is_begin) in doomed {
            if let Some(removed) = self.detach_instance(id, inst, is_begin) {
                self.unregister_dependent(&removed, id);
            }
        }
        if self.nodes[id.index()].is_container {
            for child in self.nodes[id.index()].children.clone() {
                self.remove_sync_base_times_under(child, container)?;
            }
        }
        Ok(())
    }

    fn check_new_interval(&mut self, id: TimedId, bounds: Option<IntervalBounds>) -> SmilResult<bool> {
        let Some(b) = bounds else {
            return Ok(false);
        };
        let iid = self.intervals.insert(TimeInterval {
            begin: b.begin,
            end: b.end,
            last_dur: b.last_dur,
            owner: id,
            dependents: Vec::new(),
        });
        let s = &mut self.nodes[id.index()].support;
        s.current = Some(iid);
        s.simple_dur = s.compute_simple_duration();
        s.state = if s.previous.is_none() {
            TimingState::WaitingFirst
        } else {
            TimingState::WaitingNext
        };
        tracing::debug!(element = ?id, begin = %b.begin, end = %b.end, "new interval");
        self.dispatch_on_new_interval(id)?;
        Ok(true)
    }

    fn dispatch_on_new_interval(&mut self, id: TimedId) -> SmilResult<()> {
        let node = &self.nodes[id.index()];
        let deps: Vec<(SyncDependent, bool)> = node
            .begin_dependents
            .iter()
            .map(|d| (*d, true))
            .chain(node.end_dependents.iter().map(|d| (*d, false)))
            .collect();
        for (dep, is_begin_sync) in deps {
            self.new_interval_instance(dep, id, is_begin_sync)?;
        }
        let node = &self.nodes[id.index()];
        if node.is_container {
            for child in node.children.clone() {
                self.initialize_element(child)?;
            }
        }
        Ok(())
    }

    /// Creates an instance on `dep.element` synchronized on `sync_base`'s
    /// current interval.
    fn new_interval_instance(
        &mut self,
        dep: SyncDependent,
        sync_base: TimedId,
        is_begin_sync: bool,
    ) -> SmilResult<()> {
        let Some(iid) = self.nodes[sync_base.index()].support.current else {
            return Err(SmilError::structure(format!(
                "sync-base {sync_base:?} has no current interval"
            )));
        };
        let interval = self
            .intervals
            .get(iid)
            .ok_or_else(|| SmilError::structure("sync-base interval was released"))?;
        if is_begin_sync && !interval.begin.is_resolved() {
            return Err(SmilError::structure(format!(
                "sync-base {sync_base:?} interval begin is unresolved"
            )));
        }
        let link = SyncLink {
            sync_base,
            interval: iid,
            offset: dep.offset,
            is_begin_sync,
        };
        let time = self.sync_time(&link, dep.element);
        let instance_id = self.alloc_instance_id();
        if let Some(iv) = self.intervals.get_mut(iid) {
            iv.dependents.push(Dependent {
                element: dep.element,
                instance: instance_id,
                is_begin: dep.is_begin,
            });
        }
        self.add_time_instance(
            dep.element,
            TimeInstance {
                id: instance_id,
                time,
                is_begin: dep.is_begin,
                clear_on_reset: false,
                sync: Some(link),
            },
        )
    }

    /// Time of a synchronized instance in `dependent`'s container scale.
    fn sync_time(&self, link: &SyncLink, dependent: TimedId) -> Time {
        let Some(iv) = self.intervals.get(link.interval) else {
            return Time::Unresolved;
        };
        let base = if link.is_begin_sync { iv.begin } else { iv.end };
        if !base.is_resolved() {
            return base;
        }
        let root = self.to_root_impl(link.sync_base, base.offset_by(link.offset), false);
        self.to_container_time(dependent, root)
    }

    fn alloc_instance_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance = self.next_instance.wrapping_add(1);
        id
    }

    fn insert_instance(&mut self, id: TimedId, instance: TimeInstance) {
        let s = &mut self.nodes[id.index()].support;
        if instance.is_begin {
            insert_sorted(&mut s.begin_instances, instance);
        } else {
            insert_sorted(&mut s.end_instances, instance);
        }
    }

    fn detach_instance(&mut self, id: TimedId, instance: InstanceId, is_begin: bool) -> Option<TimeInstance> {
        let s = &mut self.nodes[id.index()].support;
        let list = if is_begin {
            &mut s.begin_instances
        } else {
            &mut s.end_instances
        };
        let pos = list.iter().position(|i| i.id == instance)?;
        Some(list.remove(pos))
    }

    fn unregister_dependent(&mut self, instance: &TimeInstance, element: TimedId) {
        let Some(link) = instance.sync else {
            return;
        };
        if let Some(iv) = self.intervals.get_mut(link.interval) {
            iv.dependents
                .retain(|d| !(d.instance == instance.id && d.element == element));
        }
        self.release_if_orphan(link.interval);
    }

    /// Frees an interval no element refers to anymore.
    fn release_if_orphan(&mut self, iid: IntervalId) {
        let Some(iv) = self.intervals.get(iid) else {
            return;
        };
        let owner = &self.nodes[iv.owner.index()].support;
        let owned = owner.current == Some(iid) || owner.previous == Some(iid);
        if !owned && iv.dependents.is_empty() {
            self.intervals.remove(iid);
        }
    }

    fn set_previous(&mut self, id: TimedId, iid: Option<IntervalId>) {
        let old = std::mem::replace(&mut self.nodes[id.index()].support.previous, iid);
        if let Some(old) = old
            && Some(old) != iid
        {
            self.release_if_orphan(old);
        }
    }

    /// Removes the interval and disposes every instance synchronized on it.
    fn prune_interval(&mut self, iid: IntervalId) -> SmilResult<()> {
        let Some(interval) = self.intervals.remove(iid) else {
            return Ok(());
        };
        for dep in interval.dependents {
            self.remove_time_instance(dep.element, dep.instance, dep.is_begin)?;
        }
        Ok(())
    }

    fn prune_current_interval(&mut self, id: TimedId) -> SmilResult<()> {
        let s = &mut self.nodes[id.index()].support;
        let Some(iid) = s.current.take() else {
            return Ok(());
        };
        s.state = if s.previous.is_some() {
            TimingState::Fill
        } else {
            TimingState::NoInterval
        };
        self.prune_interval(iid)
    }

    /// Updates interval bounds, pushing the change to synchronized instances.
    fn set_interval_bounds(&mut self, iid: IntervalId, bounds: IntervalBounds) -> SmilResult<()> {
        let Some(iv) = self.intervals.get_mut(iid) else {
            return Ok(());
        };
        let changed = iv.begin != bounds.begin || iv.end != bounds.end;
        iv.begin = bounds.begin;
        iv.end = bounds.end;
        iv.last_dur = bounds.last_dur;
        if changed {
            let deps = iv.dependents.clone();
            for dep in deps {
                self.on_interval_update(dep)?;
            }
        }
        Ok(())
    }

    fn on_interval_update(&mut self, dep: Dependent) -> SmilResult<()> {
        let Some(link) = self
            .find_instance(dep.element, dep.instance)
            .and_then(|i| i.sync)
        else {
            return Ok(());
        };
        let time = self.sync_time(&link, dep.element);
        self.on_time_instance_update(dep.element, dep.instance, dep.is_begin, time)
    }

    // ---------------------------------------------------------------------
    // Instance bookkeeping

    /// Adds an unsynchronized instance that a reset discards.
    fn add_transient_instance(&mut self, id: TimedId, time: Time, is_begin: bool) -> SmilResult<()> {
        self.node(id)?;
        let instance = TimeInstance {
            id: self.alloc_instance_id(),
            time,
            is_begin,
            clear_on_reset: true,
            sync: None,
        };
        self.add_time_instance(id, instance)
    }

    fn add_time_instance(&mut self, id: TimedId, instance: TimeInstance) -> SmilResult<()> {
        let is_begin = instance.is_begin;
        let time = instance.time;
        self.insert_instance(id, instance);
        if self.nodes[id.index()].support.timing_update {
            return Ok(());
        }
        self.nodes[id.index()].support.timing_update = true;
        let result = self.reevaluate_after_add(id, is_begin, time);
        self.nodes[id.index()].support.timing_update = false;
        result
    }

    fn reevaluate_after_add(&mut self, id: TimedId, is_begin: bool, time: Time) -> SmilResult<()> {
        let state = self.nodes[id.index()].support.state;
        if state == TimingState::PreInit {
            return Ok(());
        }
        if !is_begin {
            return self.reevaluate_end_time(id);
        }
        let csd = self.container_simple_dur(id);
        match state {
            TimingState::NoInterval => {
                let first = self.nodes[id.index()].support.compute_first_interval(csd)?;
                self.check_new_interval(id, first)?;
            }
            TimingState::Fill => {
                let s = &self.nodes[id.index()].support;
                if s.attrs.restart != Restart::Never {
                    let next = match self.bounds_of(s.previous) {
                        Some(prev) => s.compute_next_interval(prev, csd)?,
                        None => s.compute_first_interval(csd)?,
                    };
                    self.check_new_interval(id, next)?;
                }
            }
            TimingState::WaitingFirst | TimingState::WaitingNext => {
                self.reevaluate_begin_time(id)?;
            }
            TimingState::Playing => {
                let s = &self.nodes[id.index()].support;
                if s.attrs.restart == Restart::Always
                    && let Some(iid) = s.current
                    && let Some(cur) = self.bounds_of(Some(iid))
                    && cur.end.greater_than(time)
                    && time > cur.begin
                {
                    let bounds = s.compute_last_dur(cur.begin, time);
                    self.set_interval_bounds(iid, bounds)?;
                }
            }
            TimingState::PreInit => {}
        }
        Ok(())
    }

    fn on_time_instance_update(
        &mut self,
        id: TimedId,
        instance: InstanceId,
        is_begin: bool,
        time: Time,
    ) -> SmilResult<()> {
        let Some(mut inst) = self.detach_instance(id, instance, is_begin) else {
            return Ok(());
        };
        inst.time = time;
        self.insert_instance(id, inst);
        let s = &self.nodes[id.index()].support;
        if s.timing_update || s.state == TimingState::PreInit {
            return Ok(());
        }
        self.nodes[id.index()].support.timing_update = true;
        let result = if is_begin {
            self.reevaluate_begin_time(id)
        } else {
            self.reevaluate_end_time(id)
        };
        self.nodes[id.index()].support.timing_update = false;
        result
    }

    fn remove_time_instance(&mut self, id: TimedId, instance: InstanceId, is_begin: bool) -> SmilResult<()> {
        if let Some(removed) = self.detach_instance(id, instance, is_begin) {
            self.unregister_dependent(&removed, id);
        }
        let s = &self.nodes[id.index()].support;
        if s.timing_update || s.state == TimingState::PreInit {
            return Ok(());
        }
        self.nodes[id.index()].support.timing_update = true;
        let result = if is_begin {
            self.reevaluate_begin_time(id)
        } else {
            self.reevaluate_end_time(id)
        };
        self.nodes[id.index()].support.timing_update = false;
        result
    }

    fn reevaluate_begin_time(&mut self, id: TimedId) -> SmilResult<()> {
        let csd = self.container_simple_dur(id);
        let s = &self.nodes[id.index()].support;
        let Some(iid) = s.current else {
            return Ok(());
        };
        let recomputed = match s.state {
            TimingState::WaitingFirst => s.compute_first_interval(csd)?,
            TimingState::WaitingNext => match self.bounds_of(s.previous) {
                Some(prev) => s.compute_next_interval(prev, csd)?,
                None => s.compute_first_interval(csd)?,
            },
            _ => return Ok(()),
        };
        match recomputed {
            Some(bounds) => self.set_interval_bounds(iid, bounds),
            None => self.prune_current_interval(id),
        }
    }

    fn reevaluate_end_time(&mut self, id: TimedId) -> SmilResult<()> {
        let s = &self.nodes[id.index()].support;
        if !matches!(
            s.state,
            TimingState::WaitingFirst | TimingState::WaitingNext | TimingState::Playing
        ) {
            return Ok(());
        }
        let Some(iid) = s.current else {
            return Ok(());
        };
        let Some(cur) = self.bounds_of(Some(iid)) else {
            return Ok(());
        };
        if let Some(end) = s.compute_end_time(cur.begin)? {
            let bounds = s.compute_last_dur(cur.begin, end);
            self.set_interval_bounds(iid, bounds)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Sampling

    fn sample_element(&mut self, id: TimedId, current: Time, seeking: bool) -> SmilResult<()> {
        loop {
            let mut end_of_interval = false;
            let mut seek_back = false;
            let state = self.nodes[id.index()].support.state;
            let cur = self.bounds_of(self.nodes[id.index()].support.current);
            match state {
                TimingState::Fill => {
                    if seeking && self.seeking_back {
                        seek_back = true;
                    }
                }
                TimingState::WaitingFirst | TimingState::WaitingNext => {
                    let Some(cur) = cur else {
                        return Err(SmilError::structure(format!(
                            "element {id:?} is waiting without an interval"
                        )));
                    };
                    if current.greater_than(cur.begin) {
                        self.dispatch_begin(id, current, seeking)?;
                        if current.greater_than(cur.end) {
                            self.dispatch_last_dur_end(id);
                            self.dispatch_end(id, current, seeking, TimingState::Playing)?;
                            end_of_interval = true;
                        }
                        let s = &mut self.nodes[id.index()].support;
                        s.state = TimingState::Playing;
                        s.play_fill = false;
                    } else if state == TimingState::WaitingNext && seeking && self.seeking_back {
                        seek_back = true;
                    }
                }
                TimingState::Playing => {
                    let Some(cur) = cur else {
                        return Err(SmilError::structure(format!(
                            "element {id:?} is playing without an interval"
                        )));
                    };
                    if current.greater_than(cur.last_dur) && !self.nodes[id.index()].support.play_fill {
                        self.dispatch_last_dur_end(id);
                        self.nodes[id.index()].support.play_fill = true;
                    }
                    if current.greater_than(cur.end) {
                        self.dispatch_end(id, current, seeking, state)?;
                        end_of_interval = true;
                    } else if !seeking {
                        self.dispatch_repeat(id, current, false)?;
                    } else if current < cur.begin {
                        self.dispatch_last_dur_end(id);
                        self.dispatch_end(id, current, seeking, state)?;
                        end_of_interval = true;
                        seek_back = true;
                    } else {
                        self.dispatch_repeat(id, current, true)?;
                    }
                }
                TimingState::PreInit | TimingState::NoInterval => {
                    self.nodes[id.index()].support.last_sample = None;
                    return Ok(());
                }
            }

            if end_of_interval {
                let ended = self.nodes[id.index()].support.current.take();
                self.set_previous(id, ended);
                let restart = self.nodes[id.index()].support.attrs.restart;
                let next = if restart == Restart::Never {
                    None
                } else if !seek_back {
                    let csd = self.container_simple_dur(id);
                    match self.bounds_of(ended) {
                        Some(prev) => self.nodes[id.index()]
                            .support
                            .compute_next_interval(prev, csd)?,
                        None => None,
                    }
                } else {
                    self.seek_to_interval(id, current)?
                };
                if !self.check_new_interval(id, next)? {
                    let s = &mut self.nodes[id.index()].support;
                    s.state = TimingState::Fill;
                    s.play_fill = false;
                }
                continue;
            }

            if seek_back {
                let target = self.seek_to_interval(id, current)?;
                let cur = self.bounds_of(self.nodes[id.index()].support.current);
                let unchanged = matches!((target, cur), (Some(t), Some(c)) if t.begin == c.begin && t.end == c.end);
                if !unchanged {
                    if let Some(old) = self.nodes[id.index()].support.current.take() {
                        self.prune_interval(old)?;
                    }
                    if self.check_new_interval(id, target)? {
                        self.dispatch_seek_end(id, current);
                        continue;
                    }
                    if self.nodes[id.index()].support.previous.is_some() {
                        let s = &mut self.nodes[id.index()].support;
                        s.state = TimingState::Fill;
                        s.play_fill = false;
                    } else {
                        self.dispatch_seek_end(id, current);
                        let s = &mut self.nodes[id.index()].support;
                        s.state = TimingState::NoInterval;
                        s.play_fill = false;
                        s.last_sample = None;
                        return Ok(());
                    }
                }
            }

            let s = &self.nodes[id.index()].support;
            let local = s.local_time(
                current,
                self.bounds_of(s.current),
                self.bounds_of(s.previous),
            );
            match local {
                Some(local) => self.sample_at(id, local, seeking)?,
                None => self.nodes[id.index()].support.last_sample = None,
            }
            return Ok(());
        }
    }

    fn sample_at(&mut self, id: TimedId, local: i64, seeking: bool) -> SmilResult<()> {
        self.nodes[id.index()].support.last_sample = Some(local);
        if !self.nodes[id.index()].is_container {
            return Ok(());
        }
        let child_time = self.children_time(id, local);
        self.nodes[id.index()].simple_time = child_time;
        for child in self.nodes[id.index()].children.clone() {
            self.sample_element(child, child_time, seeking)?;
        }
        Ok(())
    }

    fn children_time(&self, id: TimedId, local: i64) -> Time {
        Time::ms((local as f64 * self.nodes[id.index()].speed).round() as i64)
    }

    /// Walks intervals from the first one until the one containing `t`.
    /// Intermediate intervals are not committed; the last one passed becomes
    /// the element's previous interval.
    fn seek_to_interval(&mut self, id: TimedId, t: Time) -> SmilResult<Option<IntervalBounds>> {
        self.set_previous(id, None);
        let csd = self.container_simple_dur(id);
        let s = &self.nodes[id.index()].support;
        let mut previous = None;
        let mut interval = s.compute_first_interval(csd)?;
        while let Some(iv) = interval {
            if !t.greater_than(iv.end) {
                break;
            }
            previous = Some(iv);
            interval = s.compute_next_interval(iv, csd)?;
        }
        if let Some(prev) = previous {
            let iid = self.intervals.insert(TimeInterval {
                begin: prev.begin,
                end: prev.end,
                last_dur: prev.last_dur,
                owner: id,
                dependents: Vec::new(),
            });
            self.nodes[id.index()].support.previous = Some(iid);
        }
        Ok(interval)
    }

    fn dispatch_begin(&mut self, id: TimedId, current: Time, seeking: bool) -> SmilResult<()> {
        if let Some(cur) = self.current_interval(id) {
            let kind = if seeking {
                TimingEventKind::SeekBegin
            } else {
                TimingEventKind::Begin
            };
            let time = self.to_root_impl(id, cur.begin, true);
            self.emit(id, kind, time);
        }
        self.dispatch_repeat(id, current, seeking)
    }

    fn dispatch_last_dur_end(&mut self, id: TimedId) {
        if let Some(cur) = self.current_interval(id) {
            let time = self.to_root_impl(id, cur.last_dur, true);
            self.emit(id, TimingEventKind::LastDurEnd, time);
        }
    }

    fn dispatch_seek_end(&mut self, id: TimedId, current: Time) {
        let time = self.to_root_impl(id, current, false);
        self.emit(id, TimingEventKind::SeekEnd, time);
    }

    fn dispatch_end(
        &mut self,
        id: TimedId,
        current: Time,
        seeking: bool,
        state: TimingState,
    ) -> SmilResult<()> {
        let Some(cur) = self.current_interval(id) else {
            return Ok(());
        };
        if !seeking || state == TimingState::Playing {
            let time = if seeking {
                self.to_root_impl(id, current, false)
            } else {
                self.to_root_impl(id, cur.end, true)
            };
            self.emit(id, TimingEventKind::End, time);
        }
        self.dispatch_repeat(id, current, seeking)?;

        if self.nodes[id.index()].is_container {
            let (Time::Resolved(b), Time::Resolved(e)) = (cur.begin, cur.end) else {
                return Ok(());
            };
            let mut local = e - b;
            if let Time::Resolved(sd) = self.nodes[id.index()].support.simple_dur
                && local > 0
                && sd > 0
            {
                local %= sd;
                if local == 0 {
                    local = sd;
                }
            }
            self.end_children_at(id, local, seeking)?;
        }
        Ok(())
    }

    fn dispatch_repeat(&mut self, id: TimedId, current: Time, seeking: bool) -> SmilResult<()> {
        let Time::Resolved(sd) = self.nodes[id.index()].support.simple_dur else {
            return Ok(());
        };
        if sd <= 0 {
            return Ok(());
        }
        let Some(cur) = self.current_interval(id) else {
            return Ok(());
        };
        let max_time = if current.greater_than(cur.end) {
            cur.end
        } else {
            current
        };
        let (Time::Resolved(max_ms), Time::Resolved(begin)) = (max_time, cur.begin) else {
            return Ok(());
        };
        let mut iter = ((max_ms - begin) / sd).max(0);
        if max_time.is_same_time(cur.end) && (max_ms - begin) % sd == 0 && iter > 0 {
            iter -= 1;
        }
        let iter = u32::try_from(iter).unwrap_or(u32::MAX);
        let prev = std::mem::replace(&mut self.nodes[id.index()].support.cur_iter, iter);
        if !seeking {
            // A long jump over a short simple duration reports only the most
            // recent iterations.
            for i in prev.max(iter.saturating_sub(MAX_REPEAT_EVENTS))..iter {
                let at = Time::ms(begin + i64::from(i + 1) * sd);
                let time = self.to_root_impl(id, at, true);
                self.emit(id, TimingEventKind::Repeat(i + 1), time);
            }
        }
        if prev != iter && self.nodes[id.index()].is_container {
            self.end_children_at(id, sd, seeking)?;
            for child in self.nodes[id.index()].children.clone() {
                self.initialize_element(child)?;
            }
        }
        Ok(())
    }

    /// Ends every child of a container at container simple time `local` and
    /// samples them there.
    fn end_children_at(&mut self, id: TimedId, local: i64, seeking: bool) -> SmilResult<()> {
        let child_time = self.children_time(id, local);
        self.nodes[id.index()].simple_time = child_time;
        let children = self.nodes[id.index()].children.clone();
        for child in &children {
            self.add_transient_instance(*child, child_time, false)?;
        }
        for child in children {
            self.sample_element(child, child_time, seeking)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/graph.rs"]
mod tests;
