//! [`Scheduler`] backed by tokio tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tgmenu_core::{JobId, OnceJob, RecurringJob, Scheduler};
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Spawns every job on the current tokio runtime. Dropping the scheduler aborts all jobs.
#[derive(Default)]
pub struct TokioScheduler {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, AbortHandle>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs that have not finished or been cancelled.
    pub fn active_jobs(&self) -> usize {
        let mut jobs = self.jobs();
        jobs.retain(|_, handle| !handle.is_finished());
        jobs.len()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, AbortHandle>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, handle: AbortHandle) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut jobs = self.jobs();
        jobs.retain(|_, handle| !handle.is_finished());
        jobs.insert(id, handle);
        id
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_recurring(&self, interval: Duration, job: RecurringJob) -> JobId {
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                job().await;
            }
        });
        let id = self.register(task.abort_handle());
        debug!(job = id.0, ?interval, "Scheduled recurring job");
        id
    }

    fn schedule_once(&self, delay: Duration, job: OnceJob) -> JobId {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            job.await;
        });
        self.register(task.abort_handle())
    }

    fn cancel(&self, id: JobId) -> bool {
        match self.jobs().remove(&id) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.jobs().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counter_job(counter: &Arc<AtomicUsize>) -> RecurringJob {
        let counter = counter.clone();
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_job_runs_after_delay() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let id = scheduler.schedule_once(
            Duration::from_secs(5),
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!scheduler.cancel(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_once_job_never_runs() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let id = scheduler.schedule_once(
            Duration::from_secs(5),
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recurring_job_until_cancelled() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = scheduler.schedule_recurring(Duration::from_secs(10), counter_job(&counter));

        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_jobs(), 1);

        assert!(scheduler.cancel(id));
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_jobs(), 0);
    }
}
