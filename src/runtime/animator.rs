use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    foundation::error::{SmilError, SmilResult},
    runtime::{
        queue::{TimerId, UpdateQueue},
        sampler::SmilSampler,
    },
};

/// State owned by the update thread that the animator drives.
pub trait SampleHost: Send + 'static {
    fn sampler(&mut self) -> &mut SmilSampler;

    /// Samples the document at `doc_time` and applies animated values.
    fn sample_at(&mut self, doc_time: i64) -> SmilResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimatorState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
struct Control {
    state: AnimatorState,
    timer: Option<TimerId>,
    frame_interval: Duration,
}

/// Play/pause/stop control over the periodic sample task.
pub struct Animator<H> {
    queue: UpdateQueue<H>,
    control: Mutex<Control>,
}

impl<H> std::fmt::Debug for Animator<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("control", &*self.lock())
            .finish()
    }
}

impl<H> Animator<H> {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: SampleHost> Animator<H> {
    pub fn new(queue: UpdateQueue<H>, frame_interval: Duration) -> SmilResult<Self> {
        if frame_interval.is_zero() {
            return Err(SmilError::validation("frame interval must be positive"));
        }
        Ok(Self {
            queue,
            control: Mutex::new(Control {
                state: AnimatorState::Stopped,
                timer: None,
                frame_interval,
            }),
        })
    }

    pub fn state(&self) -> AnimatorState {
        self.lock().state
    }

    pub fn frame_interval(&self) -> Duration {
        self.lock().frame_interval
    }

    /// Starts or resumes sampling. Document time continues from where it was
    /// paused.
    #[tracing::instrument(skip(self))]
    pub fn play(&self) -> SmilResult<()> {
        let mut control = self.lock();
        if control.state == AnimatorState::Playing {
            return Ok(());
        }
        self.queue.invoke_later(|h: &mut H| h.sampler().play())?;
        let timer = self.queue.schedule_at_fixed_rate(
            control.frame_interval,
            |h: &mut H| {
                let t = h.sampler().tick();
                if let Err(err) = h.sample_at(t) {
                    tracing::error!(doc_time = t, error = %err, "sample failed");
                }
            },
            self.queue.default_handler(),
        )?;
        control.timer = Some(timer);
        control.state = AnimatorState::Playing;
        Ok(())
    }

    /// Stops advancing document time. Explicit mutations still repaint.
    #[tracing::instrument(skip(self))]
    pub fn pause(&self) -> SmilResult<()> {
        let mut control = self.lock();
        if control.state != AnimatorState::Playing {
            return Ok(());
        }
        if let Some(timer) = control.timer.take() {
            self.queue.unschedule(timer);
        }
        self.queue.invoke_later(|h: &mut H| h.sampler().pause())?;
        control.state = AnimatorState::Paused;
        Ok(())
    }

    /// Cancels the sampler and rewinds to time zero. Already queued one-shot
    /// tasks still run.
    #[tracing::instrument(skip(self))]
    pub fn stop(&self) -> SmilResult<()> {
        let mut control = self.lock();
        if let Some(timer) = control.timer.take() {
            self.queue.unschedule(timer);
        }
        if control.state != AnimatorState::Stopped {
            self.queue.invoke_later(|h: &mut H| h.sampler().stop())?;
        }
        control.state = AnimatorState::Stopped;
        Ok(())
    }

    /// Fixed document-time step per tick, or `None` to follow the clock.
    pub fn set_time_increment(&self, increment: Option<i64>) -> SmilResult<()> {
        self.queue
            .invoke_later(move |h: &mut H| h.sampler().set_time_increment(increment))
    }

    /// Changes the sample period. A running sampler is rescheduled in one
    /// step, so no tick is doubled or lost.
    pub fn set_frame_interval(&self, frame_interval: Duration) -> SmilResult<()> {
        if frame_interval.is_zero() {
            return Err(SmilError::validation("frame interval must be positive"));
        }
        let mut control = self.lock();
        control.frame_interval = frame_interval;
        if let Some(timer) = control.timer {
            self.queue.reschedule(timer, frame_interval)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runtime/animator.rs"]
mod tests;
