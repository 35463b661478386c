use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Envelope Metrics
    pub static ref API_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "api_responses_total",
        "Total API responses by envelope code",
        &["code"]
    )
    .unwrap();

    // Task Pool Metrics
    pub static ref TASK_POOL_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "task_pool_submissions_total",
        "Total jobs submitted to the task pool",
        &["placement"]  // placement: queued, overflow, caller_runs
    )
    .unwrap();

    pub static ref TASK_POOL_PANICS_TOTAL: IntCounter = register_int_counter!(
        "task_pool_panics_total",
        "Total task pool jobs that panicked"
    )
    .unwrap();
}

/// Initialize all metrics (called on startup)
pub fn init_metrics() {
    // Force lazy_static initialization
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&API_RESPONSES_TOTAL);
    lazy_static::initialize(&TASK_POOL_SUBMISSIONS_TOTAL);
    lazy_static::initialize(&TASK_POOL_PANICS_TOTAL);
}
