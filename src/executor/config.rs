use std::time::Duration;

/// Sizing of the bounded task pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPoolConfig {
    /// Resident workers, kept alive while idle
    pub core_size: usize,

    /// Resident plus overflow workers; overflow only starts once the queue is full
    pub max_size: usize,

    /// Jobs that may wait for a resident worker
    pub queue_capacity: usize,

    /// Prefix for worker names in log spans
    pub name_prefix: String,

    /// Drain queued jobs on shutdown instead of aborting them
    pub wait_for_tasks_on_shutdown: bool,

    /// Upper bound on the shutdown drain
    pub await_termination: Duration,
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        let cpus = available_cpus();
        Self {
            core_size: cpus,
            max_size: cpus * 2,
            queue_capacity: 100,
            name_prefix: "ai-task-".to_string(),
            wait_for_tasks_on_shutdown: true,
            await_termination: Duration::from_secs(60),
        }
    }
}

impl TaskPoolConfig {
    /// Create pool sizing from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let core_size = std::env::var("TASK_POOL_CORE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.core_size);

        Self {
            core_size,
            max_size: std::env::var("TASK_POOL_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(core_size * 2),
            queue_capacity: std::env::var("TASK_POOL_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            name_prefix: std::env::var("TASK_POOL_NAME_PREFIX")
                .unwrap_or(defaults.name_prefix),
            wait_for_tasks_on_shutdown: std::env::var("TASK_POOL_WAIT_ON_SHUTDOWN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.wait_for_tasks_on_shutdown),
            await_termination: std::env::var("TASK_POOL_AWAIT_TERMINATION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.await_termination),
        }
    }

    /// Clamp sizes so that core >= 1, max >= core and the queue holds at least one job
    pub fn normalized(mut self) -> Self {
        self.core_size = self.core_size.max(1);
        self.max_size = self.max_size.max(self.core_size);
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }

    pub fn overflow_size(&self) -> usize {
        self.max_size.saturating_sub(self.core_size)
    }
}
