use crate::{foundation::core::TimedId, timing::interval::IntervalId, timing::time::Time};

/// Identity of a time instance inside its owning element's begin or end list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u32);

/// Binding of an interval time instance to its sync-base interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncLink {
    pub sync_base: TimedId,
    pub interval: IntervalId,
    pub offset: i64, // in the sync-base's container time
    pub is_begin_sync: bool,
}

/// A begin or end time point owned by one timed element.
///
/// Plain instances come from offsets, events and script calls. Instances with a
/// [`SyncLink`] track another element's interval and are re-synced whenever that
/// interval changes.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeInstance {
    pub id: InstanceId,
    pub time: Time,
    pub is_begin: bool,
    pub clear_on_reset: bool,
    pub sync: Option<SyncLink>,
}

impl TimeInstance {
    pub fn is_interval_instance(&self) -> bool {
        self.sync.is_some()
    }
}

/// Inserts `instance` keeping `list` sorted by time; equal times keep insertion order.
pub(crate) fn insert_sorted(list: &mut Vec<TimeInstance>, instance: TimeInstance) {
    let at = list.partition_point(|existing| instance.time.greater_than(existing.time));
    list.insert(at, instance);
}

/// First instance time `>= after`.
pub(crate) fn time_after(after: Time, list: &[TimeInstance]) -> Option<Time> {
    list.iter()
        .map(|i| i.time)
        .find(|t| t.greater_than(after))
}

/// First instance time strictly after `after`.
pub(crate) fn time_after_strict(after: Time, list: &[TimeInstance]) -> Option<Time> {
    list.iter().map(|i| i.time).find(|t| *t > after)
}

#[cfg(test)]
#[path = "../../tests/unit/timing/instance.rs"]
mod tests;
