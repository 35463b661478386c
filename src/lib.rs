// Library exports for testing
pub mod api;
pub mod config;
pub mod errors;
pub mod executor;
pub mod metrics;
