use crate::{
    foundation::core::TimedId,
    timing::{instance::InstanceId, time::Time},
};

/// Handle of a [`TimeInterval`] in the graph's interval store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntervalId(pub u32);

/// Begin/end pair of a candidate interval, before it is committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalBounds {
    pub begin: Time,
    pub end: Time,
    pub last_dur: Time, // end of the last simple duration, <= end
}

/// Reference from an interval to an instance synchronized on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dependent {
    pub element: TimedId,
    pub instance: InstanceId,
    pub is_begin: bool, // which list of `element` holds the instance
}

/// One committed activation window of a timed element.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeInterval {
    pub begin: Time,
    pub end: Time,
    pub last_dur: Time,
    pub owner: TimedId,
    pub(crate) dependents: Vec<Dependent>,
}

impl TimeInterval {
    pub fn bounds(&self) -> IntervalBounds {
        IntervalBounds {
            begin: self.begin,
            end: self.end,
            last_dur: self.last_dur,
        }
    }
}

/// Slot storage for intervals; freed slots are reused.
#[derive(Debug, Default)]
pub(crate) struct IntervalStore {
    slots: Vec<Option<TimeInterval>>,
    free: Vec<u32>,
}

impl IntervalStore {
    pub(crate) fn insert(&mut self, interval: TimeInterval) -> IntervalId {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize] = Some(interval);
                IntervalId(idx)
            }
            None => {
                self.slots.push(Some(interval));
                IntervalId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn get(&self, id: IntervalId) -> Option<&TimeInterval> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: IntervalId) -> Option<&mut TimeInterval> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn remove(&mut self, id: IntervalId) -> Option<TimeInterval> {
        let taken = self.slots.get_mut(id.0 as usize).and_then(Option::take);
        if taken.is_some() {
            self.free.push(id.0);
        }
        taken
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/interval.rs"]
mod tests;
