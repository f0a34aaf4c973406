//! Job scheduling capability used for the expiry sweep and poll timeouts.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

/// Handle for cancelling a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

/// Factory producing one run of a recurring job.
pub type RecurringJob = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Single run of a one-shot job.
pub type OnceJob = BoxFuture<'static, ()>;

pub trait Scheduler: Send + Sync {
    /// Runs `job` every `interval`, first run one interval from now.
    fn schedule_recurring(&self, interval: Duration, job: RecurringJob) -> JobId;

    /// Runs `job` once after `delay`.
    fn schedule_once(&self, delay: Duration, job: OnceJob) -> JobId;

    /// Cancels a job. Returns false when the job already ran or was never scheduled.
    fn cancel(&self, id: JobId) -> bool;
}
