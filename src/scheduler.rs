// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delayed and periodic task scheduling.
//!
//! [`Scheduler`] is a cheap handle to a tokio runtime that the adapter and
//! its devices use for every timer: initialization retries, passive scan
//! re-arming, housekeeping sweeps and per-device connect and procedure
//! timeouts. Every scheduled task returns a [`ScheduledTask`] that cancels
//! it.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Handle to the runtime running scheduled work.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bluegiga_lib::Scheduler;
///
/// # #[tokio::main]
/// # async fn main() {
/// let scheduler = Scheduler::current();
/// let task = scheduler.schedule(Duration::from_secs(60), || async {
///     println!("never printed");
/// });
/// task.cancel();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    /// Creates a scheduler spawning onto `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler for the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Runs `future` as soon as possible.
    pub fn spawn<F>(&self, future: F) -> ScheduledTask
    where
        F: Future<Output = ()> + Send + 'static,
    {
        ScheduledTask::new(self.handle.spawn(future).abort_handle())
    }

    /// Runs `task` once after `delay`.
    pub fn schedule<F, Fut>(&self, delay: Duration, task: F) -> ScheduledTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;
        })
    }

    /// Runs `task` after `initial_delay`, then again `period` after each run
    /// completes, until cancelled.
    pub fn schedule_with_fixed_delay<F, Fut>(
        &self,
        initial_delay: Duration,
        period: Duration,
        mut task: F,
    ) -> ScheduledTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                task().await;
                tokio::time::sleep(period).await;
            }
        })
    }
}

/// A cancellable scheduled task.
///
/// Dropping the handle does not cancel the task.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    handle: AbortHandle,
}

impl ScheduledTask {
    fn new(handle: AbortHandle) -> Self {
        Self { handle }
    }

    /// Cancels the task. Idempotent; has no effect on a finished task.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns true once the task has completed or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn delayed_task_runs_after_delay() {
        let scheduler = Scheduler::current();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let task = scheduler.schedule(Duration::from_secs(10), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let scheduler = Scheduler::current();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let task = scheduler.schedule(Duration::from_secs(1), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();
        task.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_task_repeats() {
        let scheduler = Scheduler::current();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let task = scheduler.schedule_with_fixed_delay(
            Duration::ZERO,
            Duration::from_secs(60),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
