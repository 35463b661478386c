use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::EnvelopeCode;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware to log every API call: what was called, how it ended and how long it took
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    // Extract request information
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let query = request.uri().query().unwrap_or("").to_string();

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route,
        query = %sanitize_query(&query),
        "API request started"
    );

    // Process request
    let mut response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();
    let code = response
        .extensions()
        .get::<EnvelopeCode>()
        .map(|EnvelopeCode(code)| *code);

    if status.is_server_error() {
        error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            code = ?code,
            duration_ms = %duration_ms,
            "API request failed (server error)"
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            code = ?code,
            duration_ms = %duration_ms,
            "API request failed (client error)"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            code = ?code,
            duration_ms = %duration_ms,
            "API request completed"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Mask the values of credential-like query parameters
fn sanitize_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{}=***", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Keys are compared after percent-decoding; undecodable keys are masked.
fn is_sensitive_key(raw: &str) -> bool {
    match urlencoding::decode(&raw.replace('+', " ")) {
        Ok(key) => is_sensitive(&key),
        Err(_) => true,
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["api_key", "token", "password", "secret"]
        .iter()
        .any(|s| key == *s || key.ends_with(&format!("_{}", s)))
}
