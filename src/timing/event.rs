use crate::{foundation::core::TimedId, timing::time::Time};

/// Kind of a timing event emitted while sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimingEventKind {
    Begin,
    End,
    /// Start of iteration `n` (1-based count of completed simple durations).
    Repeat(u32),
    /// The last simple duration of the interval finished.
    LastDurEnd,
    SeekBegin,
    SeekEnd,
}

impl TimingEventKind {
    /// Name used by event-base conditions (`id.beginEvent`), if any.
    pub fn event_name(self) -> Option<&'static str> {
        match self {
            TimingEventKind::Begin => Some("beginEvent"),
            TimingEventKind::End => Some("endEvent"),
            TimingEventKind::Repeat(_) => Some("repeatEvent"),
            _ => None,
        }
    }
}

/// An event emitted by a timed element, stamped with root time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingEvent {
    pub element: TimedId,
    pub kind: TimingEventKind,
    pub time: Time,
}
