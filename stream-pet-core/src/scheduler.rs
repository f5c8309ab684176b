//! Cancellable timers for the pet.
//!
//! Every delayed or recurring callback the pet schedules goes through a
//! [`Scheduler`], so a configuration reload can drop all of them at once
//! and a shutdown can wait for them to finish.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Spawns timer tasks that die together on [`Scheduler::reset`] or
/// [`Scheduler::shutdown`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Debug)]
struct SchedulerInner {
    /// Cancelled on shutdown only.
    root: CancellationToken,
    /// Child of `root`, swapped for a fresh one on every reset.
    generation: Mutex<CancellationToken>,
    tracker: TaskTracker,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new() -> Self {
        let root = CancellationToken::new();
        let generation = Mutex::new(root.child_token());
        Self {
            inner: Arc::new(SchedulerInner {
                root,
                generation,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Run `future` until it completes or the current generation is cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.inner.generation.lock().clone();
        if token.is_cancelled() {
            tracing::trace!("scheduler shut down, dropping task");
            return;
        }
        self.inner.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = future => {}
            }
        });
    }

    /// Call `task` once after `delay`.
    pub fn after<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            time::sleep(delay).await;
            task();
        });
    }

    /// Call `tick` every `period`, starting one period from now.
    ///
    /// A zero period would spin, so it is ignored.
    pub fn every<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            tracing::debug!("ignoring recurring timer with zero period");
            return;
        }
        self.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick();
            }
        });
    }

    /// Cancel every pending task but keep accepting new ones.
    pub fn reset(&self) {
        let mut generation = self.inner.generation.lock();
        generation.cancel();
        *generation = self.inner.root.child_token();
    }

    /// Cancel every pending task and refuse new ones.
    pub fn shutdown(&self) {
        self.inner.root.cancel();
        self.inner.tracker.close();
    }

    /// Whether [`Scheduler::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Wait for all tasks to exit after a shutdown.
    pub async fn wait(&self) {
        self.inner.tracker.wait().await;
    }
}
