pub mod middleware;
pub mod registry;

use anyhow::Context;
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, TextEncoder};

use crate::errors::ApiError;

/// Prometheus scrape endpoint.
///
/// Served as plain exposition text; an encoding failure is dispatched like any
/// other unclassified error.
pub async fn metrics_handler() -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&prometheus::gather())
        .context("encoding metrics")?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type())], body).into_response())
}
