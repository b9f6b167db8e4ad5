use std::sync::Arc;

use crate::runtime::clock::Clock;

/// Turns clock readings into document time for each sample tick.
///
/// While playing, document time follows the clock from the point where
/// playback (re)started, or advances by a fixed increment per tick when one
/// is set. While paused or stopped it stays where it is.
pub struct SmilSampler {
    clock: Arc<dyn Clock>,
    time_increment: Option<i64>,
    doc_time: i64,
    anchor: Option<(i64, i64)>, // (clock ms, doc ms) at the last (re)start
    primed: bool,
}

impl std::fmt::Debug for SmilSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmilSampler")
            .field("time_increment", &self.time_increment)
            .field("doc_time", &self.doc_time)
            .field("playing", &self.is_playing())
            .finish()
    }
}

impl SmilSampler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            time_increment: None,
            doc_time: 0,
            anchor: None,
            primed: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn time_increment(&self) -> Option<i64> {
        self.time_increment
    }

    /// Current document time without advancing anything.
    pub fn current_time(&self) -> i64 {
        match (self.anchor, self.time_increment) {
            (Some((clock, doc)), None) => doc + (self.clock.now_ms() - clock),
            _ => self.doc_time,
        }
    }

    pub fn play(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some((self.clock.now_ms(), self.doc_time));
        }
    }

    pub fn pause(&mut self) {
        self.doc_time = self.current_time();
        self.anchor = None;
    }

    /// Pauses and rewinds to document time zero.
    pub fn stop(&mut self) {
        self.anchor = None;
        self.doc_time = 0;
        self.primed = false;
    }

    /// Jumps to `doc_time`, keeping the play state.
    pub fn seek(&mut self, doc_time: i64) {
        self.doc_time = doc_time;
        self.primed = false;
        if self.anchor.is_some() {
            self.anchor = Some((self.clock.now_ms(), doc_time));
        }
    }

    /// `None` follows the clock; `Some(ms)` advances by `ms` per tick.
    pub fn set_time_increment(&mut self, increment: Option<i64>) {
        self.doc_time = self.current_time();
        self.time_increment = increment.filter(|ms| *ms > 0);
        if self.anchor.is_some() {
            self.anchor = Some((self.clock.now_ms(), self.doc_time));
        }
    }

    /// Document time for the next sample.
    pub fn tick(&mut self) -> i64 {
        if !self.is_playing() {
            return self.doc_time;
        }
        match self.time_increment {
            Some(step) => {
                if self.primed {
                    self.doc_time += step;
                }
                self.primed = true;
            }
            None => self.doc_time = self.current_time(),
        }
        self.doc_time
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runtime/sampler.rs"]
mod tests;
