use std::{
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, mpsc},
    thread::{JoinHandle, ThreadId},
    time::{Duration, Instant},
};

use crate::foundation::error::{SmilError, SmilResult};

/// One-shot work item run on the update thread.
pub type Task<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Called on the update thread after a task (or periodic tick) completes.
pub type RunHandler<S> = Arc<dyn Fn(&mut S) + Send + Sync + 'static>;

type PeriodicTask<S> = Arc<dyn Fn(&mut S) + Send + Sync + 'static>;

/// Handle of a task registered with [`UpdateQueue::schedule_at_fixed_rate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Lifecycle of the update thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Suspending,
    Suspended,
    Terminated,
}

struct Entry<S> {
    task: Task<S>,
    handler: Option<RunHandler<S>>,
}

struct Timer<S> {
    id: TimerId,
    period: Duration,
    next: Instant,
    task: PeriodicTask<S>,
    handler: Option<RunHandler<S>>,
}

struct Inner<S> {
    state: QueueState,
    tasks: VecDeque<Entry<S>>,
    timers: Vec<Timer<S>>,
    next_timer: u64,
}

struct Shared<S> {
    inner: Mutex<Inner<S>>,
    cond: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: OnceLock<ThreadId>,
    default_handler: Option<RunHandler<S>>,
}

enum Work<S> {
    Task(Entry<S>),
    Ticks(Vec<(PeriodicTask<S>, Option<RunHandler<S>>)>),
}

/// Single ordered executor that owns the engine state `S`.
///
/// All mutation of `S` happens on the one worker thread. Other threads only
/// enqueue work. The worker starts suspended: tasks queue up but nothing
/// runs until [`UpdateQueue::resume`]. Handles are cheap clones of the same
/// queue; [`UpdateQueue::shutdown`] stops it for all of them.
pub struct UpdateQueue<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for UpdateQueue<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for UpdateQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("state", &self.state())
            .field("size", &self.size())
            .finish()
    }
}

impl<S: Send + 'static> UpdateQueue<S> {
    /// Spawns the worker thread in the suspended state. `default_handler`
    /// runs after every task submitted without an explicit handler.
    pub fn start(
        name: &str,
        state: S,
        default_handler: Option<RunHandler<S>>,
    ) -> SmilResult<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: QueueState::Suspended,
                tasks: VecDeque::new(),
                timers: Vec::new(),
                next_timer: 0,
            }),
            cond: Condvar::new(),
            worker: Mutex::new(None),
            worker_id: OnceLock::new(),
            default_handler,
        });
        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run_worker(worker_shared, state))
            .map_err(|e| SmilError::Other(anyhow::Error::new(e).context("spawn update thread")))?;
        let _ = shared.worker_id.set(handle.thread().id());
        *lock_worker(&shared) = Some(handle);
        tracing::debug!(name, "update queue started");
        Ok(Self { shared })
    }
}

impl<S> UpdateQueue<S> {
    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn state(&self) -> QueueState {
        self.lock().state
    }

    /// `true` when called from the update thread itself.
    pub fn is_update_thread(&self) -> bool {
        self.shared
            .worker_id
            .get()
            .is_some_and(|id| *id == std::thread::current().id())
    }

    /// Handler attached to tasks submitted without an explicit one.
    pub fn default_handler(&self) -> Option<RunHandler<S>> {
        self.shared.default_handler.clone()
    }

    fn push(&self, entry: Entry<S>, front: bool) -> SmilResult<()> {
        let mut inner = self.lock();
        if inner.state == QueueState::Terminated {
            return Err(SmilError::QueueStopped);
        }
        if front {
            inner.tasks.push_front(entry);
        } else {
            inner.tasks.push_back(entry);
        }
        self.shared.cond.notify_all();
        Ok(())
    }

    /// Appends `task`; it runs after everything already queued.
    pub fn invoke_later(&self, task: impl FnOnce(&mut S) + Send + 'static) -> SmilResult<()> {
        self.invoke_later_with_handler(task, self.shared.default_handler.clone())
    }

    pub fn invoke_later_with_handler(
        &self,
        task: impl FnOnce(&mut S) + Send + 'static,
        handler: Option<RunHandler<S>>,
    ) -> SmilResult<()> {
        self.push(
            Entry {
                task: Box::new(task),
                handler,
            },
            false,
        )
    }

    /// Puts `task` at the head of the queue.
    pub fn preempt_later(
        &self,
        task: impl FnOnce(&mut S) + Send + 'static,
        handler: Option<RunHandler<S>>,
    ) -> SmilResult<()> {
        self.push(
            Entry {
                task: Box::new(task),
                handler,
            },
            true,
        )
    }

    /// Runs `task` on the update thread and blocks until it completes.
    ///
    /// Fails with [`SmilError::Interrupted`] when the task is dropped without
    /// running (queue emptied or shut down), and with [`SmilError::Other`]
    /// when the task itself panicked.
    pub fn invoke_and_wait<R, F>(&self, task: F) -> SmilResult<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_update_thread() {
            return Err(SmilError::structure(
                "invoke_and_wait called on the update thread",
            ));
        }
        let (tx, rx) = mpsc::sync_channel::<Result<R, String>>(1);
        self.invoke_later(move |s: &mut S| {
            let out = catch_unwind(AssertUnwindSafe(|| task(s))).map_err(|p| panic_message(&p));
            let _ = tx.send(out);
        })?;
        match rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(msg)) => Err(SmilError::Other(anyhow::anyhow!("task panicked: {msg}"))),
            Err(_) => Err(SmilError::Interrupted),
        }
    }

    /// Runs `task` every `period` on the update thread, starting right away.
    /// Ticks missed while the thread was busy are skipped, not replayed.
    pub fn schedule_at_fixed_rate(
        &self,
        period: Duration,
        task: impl Fn(&mut S) + Send + Sync + 'static,
        handler: Option<RunHandler<S>>,
    ) -> SmilResult<TimerId> {
        if period.is_zero() {
            return Err(SmilError::validation("timer period must be positive"));
        }
        let mut inner = self.lock();
        if inner.state == QueueState::Terminated {
            return Err(SmilError::QueueStopped);
        }
        let id = TimerId(inner.next_timer);
        inner.next_timer += 1;
        inner.timers.push(Timer {
            id,
            period,
            next: Instant::now(),
            task: Arc::new(task),
            handler,
        });
        self.shared.cond.notify_all();
        Ok(id)
    }

    /// Returns `false` if `id` was not scheduled.
    pub fn unschedule(&self, id: TimerId) -> bool {
        let mut inner = self.lock();
        let before = inner.timers.len();
        inner.timers.retain(|t| t.id != id);
        before != inner.timers.len()
    }

    /// Changes the period of `id` under one lock, so the old and the new
    /// schedule never both fire. The next tick is one new period from now.
    pub fn reschedule(&self, id: TimerId, period: Duration) -> SmilResult<bool> {
        if period.is_zero() {
            return Err(SmilError::validation("timer period must be positive"));
        }
        let mut inner = self.lock();
        let Some(timer) = inner.timers.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        timer.period = period;
        timer.next = Instant::now() + period;
        self.shared.cond.notify_all();
        Ok(true)
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.lock().timers.iter().any(|t| t.id == id)
    }

    /// Number of queued one-shot tasks.
    pub fn size(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Drops every queued one-shot task. Waiters on dropped tasks get
    /// [`SmilError::Interrupted`].
    pub fn empty(&self) {
        let dropped: Vec<_> = self.lock().tasks.drain(..).collect();
        drop(dropped);
    }

    pub fn resume(&self) -> SmilResult<()> {
        let mut inner = self.lock();
        match inner.state {
            QueueState::Terminated => Err(SmilError::QueueStopped),
            _ => {
                inner.state = QueueState::Running;
                self.shared.cond.notify_all();
                Ok(())
            }
        }
    }

    /// Stops running tasks after the current one. Blocks until the worker
    /// is idle unless called from the update thread.
    pub fn suspend(&self) -> SmilResult<()> {
        let mut inner = self.lock();
        match inner.state {
            QueueState::Terminated => return Err(SmilError::QueueStopped),
            QueueState::Suspended => return Ok(()),
            _ => {}
        }
        if self.is_update_thread() {
            inner.state = QueueState::Suspended;
            return Ok(());
        }
        inner.state = QueueState::Suspending;
        self.shared.cond.notify_all();
        while inner.state == QueueState::Suspending {
            inner = self
                .shared
                .cond
                .wait(inner)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        Ok(())
    }

    /// Terminates the worker, dropping queued tasks and timers, and joins it
    /// (unless called from the update thread).
    pub fn shutdown(&self) {
        let (tasks, timers) = {
            let mut inner = self.lock();
            inner.state = QueueState::Terminated;
            self.shared.cond.notify_all();
            (
                inner.tasks.drain(..).collect::<Vec<_>>(),
                std::mem::take(&mut inner.timers),
            )
        };
        drop(tasks);
        drop(timers);
        if self.is_update_thread() {
            return;
        }
        let handle = lock_worker(&self.shared).take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::error!("update thread exited with a panic");
        }
    }
}

fn lock_worker<S>(shared: &Shared<S>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    shared
        .worker
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// After a batch of timer ticks one queued task is served before timers are
/// looked at again, so an overrunning periodic task cannot starve the queue.
fn next_work<S>(shared: &Shared<S>, after_ticks: bool) -> Option<Work<S>> {
    let mut inner = shared
        .inner
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    loop {
        match inner.state {
            QueueState::Terminated => return None,
            QueueState::Suspending => {
                inner.state = QueueState::Suspended;
                shared.cond.notify_all();
                continue;
            }
            QueueState::Suspended => {
                inner = shared
                    .cond
                    .wait(inner)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                continue;
            }
            QueueState::Running => {}
        }

        if after_ticks && let Some(entry) = inner.tasks.pop_front() {
            return Some(Work::Task(entry));
        }

        let now = Instant::now();
        let mut due = Vec::new();
        for timer in inner.timers.iter_mut().filter(|t| t.next <= now) {
            due.push((Arc::clone(&timer.task), timer.handler.clone()));
            while timer.next <= now {
                timer.next += timer.period;
            }
        }
        if !due.is_empty() {
            return Some(Work::Ticks(due));
        }
        if let Some(entry) = inner.tasks.pop_front() {
            return Some(Work::Task(entry));
        }

        let wake = inner.timers.iter().map(|t| t.next).min();
        inner = match wake {
            Some(at) => {
                shared
                    .cond
                    .wait_timeout(inner, at.saturating_duration_since(now))
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .0
            }
            None => shared
                .cond
                .wait(inner)
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        };
    }
}

fn run_guarded<S>(state: &mut S, what: &str, f: impl FnOnce(&mut S)) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(state))) {
        tracing::error!(what, panic = %panic_message(&payload), "update task failed");
    }
}

fn run_worker<S>(shared: Arc<Shared<S>>, mut state: S) {
    let mut after_ticks = false;
    while let Some(work) = next_work(&shared, after_ticks) {
        after_ticks = matches!(work, Work::Ticks(_));
        match work {
            Work::Task(Entry { task, handler }) => {
                run_guarded(&mut state, "task", task);
                if let Some(h) = handler {
                    run_guarded(&mut state, "run handler", |s| h(s));
                }
            }
            Work::Ticks(due) => {
                for (task, handler) in due {
                    run_guarded(&mut state, "periodic task", |s| task(s));
                    if let Some(h) = handler {
                        run_guarded(&mut state, "run handler", |s| h(s));
                    }
                }
            }
        }
    }
    tracing::debug!("update thread exiting");
}

#[cfg(test)]
#[path = "../../tests/unit/runtime/queue.rs"]
mod tests;
