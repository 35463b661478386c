//! Bounded task pool for slow, I/O-bound work
//!
//! Resident workers drain a bounded queue. Once the queue is full, a limited
//! number of overflow tasks take jobs directly, and when those are busy too the
//! submitting task runs the job itself. Jobs are never dropped, and callers
//! that keep submitting into a saturated pool are slowed down to its pace.

pub mod config;

pub use config::TaskPoolConfig;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use utoipa::ToSchema;

use crate::metrics::registry::{TASK_POOL_PANICS_TOTAL, TASK_POOL_SUBMISSIONS_TOTAL};

type Job = BoxFuture<'static, ()>;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("task pool is shut down")]
    Shutdown,

    #[error("task was dropped before completing")]
    Dropped,

    #[error("task pool did not terminate within {0:?}")]
    TerminationTimeout(Duration),
}

/// Where a submitted job ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Waiting for (or picked up by) a resident worker
    Queued,
    /// Running on an overflow task
    Overflow,
    /// Already run to completion by the submitter
    CallerRan,
}

impl Placement {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Overflow => "overflow",
            Self::CallerRan => "caller_runs",
        }
    }
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutorStats {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
    /// Jobs currently waiting in the queue
    pub queued: usize,
    /// Overflow tasks currently running
    pub overflow_active: usize,
    /// Jobs run by their submitter because the pool was saturated
    pub caller_runs: u64,
}

/// Cheaply cloneable handle to the task pool
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    config: TaskPoolConfig,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    overflow: Arc<Semaphore>,
    caller_runs: AtomicU64,
}

impl TaskExecutor {
    /// Spawn the resident workers. Must be called inside a tokio runtime.
    pub fn new(config: TaskPoolConfig) -> Self {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (1..=config.core_size)
            .map(|i| {
                let name = format!("{}{}", config.name_prefix, i);
                let queue = receiver.clone();
                tokio::spawn(worker_loop(queue).instrument(info_span!("task_worker", worker = %name)))
            })
            .collect();

        info!(
            core_size = config.core_size,
            max_size = config.max_size,
            queue_capacity = config.queue_capacity,
            "Task pool initialized"
        );

        Self {
            inner: Arc::new(Inner {
                overflow: Arc::new(Semaphore::new(config.overflow_size())),
                config,
                sender: Mutex::new(Some(sender)),
                workers: Mutex::new(workers),
                caller_runs: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &TaskPoolConfig {
        &self.inner.config
    }

    /// Hand a job to the pool.
    ///
    /// Resolves once the job is placed; for `Placement::CallerRan` that means
    /// after the job has finished.
    pub async fn submit<F>(&self, task: F) -> Result<Placement, ExecutorError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.lock_sender().clone().ok_or(ExecutorError::Shutdown)?;

        let placement = match sender.try_send(task.boxed()) {
            Ok(()) => Placement::Queued,
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(ExecutorError::Shutdown),
            Err(mpsc::error::TrySendError::Full(job)) => {
                match self.inner.overflow.clone().try_acquire_owned() {
                    Ok(permit) => {
                        tokio::spawn(async move {
                            run_guarded(job).await;
                            drop(permit);
                        });
                        Placement::Overflow
                    }
                    Err(_) => {
                        warn!("Task pool saturated, running job on the caller");
                        self.inner.caller_runs.fetch_add(1, Ordering::Relaxed);
                        run_guarded(job).await;
                        Placement::CallerRan
                    }
                }
            }
        };

        TASK_POOL_SUBMISSIONS_TOTAL
            .with_label_values(&[placement.as_label()])
            .inc();
        Ok(placement)
    }

    /// Submit a job and wait for its output
    pub async fn run<F, T>(&self, task: F) -> Result<T, ExecutorError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(async move {
            let _ = tx.send(task.await);
        })
        .await?;

        rx.await.map_err(|_| ExecutorError::Dropped)
    }

    pub fn stats(&self) -> ExecutorStats {
        let config = &self.inner.config;
        let queued = self
            .lock_sender()
            .as_ref()
            .map(|s| s.max_capacity() - s.capacity())
            .unwrap_or(0);

        ExecutorStats {
            core_size: config.core_size,
            max_size: config.max_size,
            queue_capacity: config.queue_capacity,
            queued,
            overflow_active: config
                .overflow_size()
                .saturating_sub(self.inner.overflow.available_permits()),
            caller_runs: self.inner.caller_runs.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting jobs, then drain or abort what is left.
    ///
    /// Calling it again after a completed shutdown is a no-op.
    pub async fn shutdown(&self) -> Result<(), ExecutorError> {
        let Some(sender) = self.lock_sender().take() else {
            return Ok(());
        };
        drop(sender);

        let workers = std::mem::take(
            &mut *self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let config = &self.inner.config;

        if !config.wait_for_tasks_on_shutdown {
            for worker in &workers {
                worker.abort();
            }
            self.inner.overflow.close();
            info!("Task pool aborted");
            return Ok(());
        }

        info!(
            timeout_secs = config.await_termination.as_secs(),
            "Waiting for queued tasks to finish"
        );

        let overflow = self.inner.overflow.clone();
        let overflow_slots = u32::try_from(config.overflow_size()).unwrap_or(u32::MAX);
        let drain = async move {
            for worker in workers {
                let _ = worker.await;
            }
            let _ = overflow.acquire_many(overflow_slots).await;
        };

        match tokio::time::timeout(config.await_termination, drain).await {
            Ok(()) => {
                info!("Task pool terminated");
                Ok(())
            }
            Err(_) => {
                warn!("Task pool did not terminate in time");
                Err(ExecutorError::TerminationTimeout(config.await_termination))
            }
        }
    }

    fn lock_sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<Job>>> {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn worker_loop(queue: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = queue.lock().await.recv().await;
        match job {
            Some(job) => run_guarded(job).await,
            None => break,
        }
    }
    debug!("Worker stopped");
}

/// Run a job, keeping a panic inside it from taking the worker down
async fn run_guarded(job: Job) {
    if AssertUnwindSafe(job).catch_unwind().await.is_err() {
        TASK_POOL_PANICS_TOTAL.inc();
        error!("Task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    fn small_pool(core: usize, max: usize, queue: usize) -> TaskPoolConfig {
        TaskPoolConfig {
            core_size: core,
            max_size: max,
            queue_capacity: queue,
            name_prefix: "test-task-".to_string(),
            wait_for_tasks_on_shutdown: true,
            await_termination: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let executor = TaskExecutor::new(small_pool(2, 4, 10));
        let value = assert_ok!(executor.run(async { 21 * 2 }).await);
        assert_eq!(value, 42);
        assert_ok!(executor.shutdown().await);
    }

    #[tokio::test]
    async fn test_saturation_falls_back_to_overflow_then_caller() {
        let executor = TaskExecutor::new(small_pool(1, 2, 1));
        let gate = Arc::new(Semaphore::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let blocking_job = |gate: Arc<Semaphore>, done: Arc<AtomicUsize>| async move {
            let _permit = gate.acquire().await;
            done.fetch_add(1, Ordering::SeqCst);
        };

        // Workers have not been polled yet, so the first job stays in the queue
        let first = executor
            .submit(blocking_job(gate.clone(), done.clone()))
            .await;
        assert_eq!(assert_ok!(first), Placement::Queued);

        let second = executor
            .submit(blocking_job(gate.clone(), done.clone()))
            .await;
        assert_eq!(assert_ok!(second), Placement::Overflow);

        let inline_done = done.clone();
        let third = executor
            .submit(async move {
                inline_done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(assert_ok!(third), Placement::CallerRan);
        assert_eq!(done.load(Ordering::SeqCst), 1);

        let stats = executor.stats();
        assert_eq!(stats.caller_runs, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.overflow_active, 1);

        gate.add_permits(10);
        assert_ok!(executor.shutdown().await);
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let executor = TaskExecutor::new(small_pool(1, 1, 4));
        assert_ok!(executor.shutdown().await);
        assert_ok!(executor.shutdown().await);

        let result = executor.submit(async {}).await;
        assert!(matches!(assert_err!(result), ExecutorError::Shutdown));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let executor = TaskExecutor::new(small_pool(1, 1, 4));

        let result = executor
            .run(async {
                if true {
                    panic!("job blew up");
                }
            })
            .await;
        assert!(matches!(assert_err!(result), ExecutorError::Dropped));

        let value = assert_ok!(executor.run(async { "still alive" }).await);
        assert_eq!(value, "still alive");
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_stuck_job() {
        let mut config = small_pool(1, 1, 4);
        config.await_termination = Duration::from_millis(50);
        let executor = TaskExecutor::new(config);

        assert_ok!(executor.submit(std::future::pending::<()>()).await);
        let result = executor.shutdown().await;
        assert!(matches!(
            assert_err!(result),
            ExecutorError::TerminationTimeout(_)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_without_waiting_aborts() {
        let mut config = small_pool(1, 1, 4);
        config.wait_for_tasks_on_shutdown = false;
        let executor = TaskExecutor::new(config);

        assert_ok!(executor.submit(std::future::pending::<()>()).await);
        assert_ok!(executor.shutdown().await);
        assert_eq!(executor.stats().queued, 0);
    }
}
