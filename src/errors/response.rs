use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

use super::codes::ErrorKind;

/// Highest timestamp handed out so far; keeps envelope timestamps non-decreasing
/// even if the wall clock steps backwards.
static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

fn now_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_TIMESTAMP_MS.fetch_max(now, Ordering::SeqCst);
    previous.max(now)
}

/// Uniform response envelope returned by every endpoint
///
/// Serialized as `{"code", "message", "data", "timestamp"}`. `data` is `null`
/// on failures; `timestamp` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope<T> {
    code: i32,
    message: String,
    data: Option<T>,
    timestamp: i64,
}

/// Envelope code attached to the HTTP response so middleware can see it
/// without parsing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCode(pub i32);

impl<T> ResponseEnvelope<T> {
    fn new(code: i32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            timestamp: now_millis(),
        }
    }

    // ========== success ==========

    pub fn success_empty() -> Self {
        Self::new(
            ErrorKind::Success.code(),
            ErrorKind::Success.default_message(),
            None,
        )
    }

    pub fn success(data: T) -> Self {
        Self::new(
            ErrorKind::Success.code(),
            ErrorKind::Success.default_message(),
            Some(data),
        )
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self::new(ErrorKind::Success.code(), message, Some(data))
    }

    // ========== failure ==========

    pub fn fail() -> Self {
        Self::fail_kind(ErrorKind::InternalServerError)
    }

    pub fn fail_with_message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError.code(), message, None)
    }

    /// `ErrorKind::Success` is not a failure and is answered as
    /// `InternalServerError`.
    pub fn fail_kind(kind: ErrorKind) -> Self {
        let kind = failure_kind(kind);
        Self::new(kind.code(), kind.default_message(), None)
    }

    pub fn fail_kind_with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(failure_kind(kind).code(), message, None)
    }

    /// Fully custom code and message. The success code is replaced with the
    /// internal error code.
    pub fn fail_code(code: i32, message: impl Into<String>) -> Self {
        let code = if code == ErrorKind::Success.code() {
            ErrorKind::InternalServerError.code()
        } else {
            code
        };
        Self::new(code, message, None)
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorKind::Success.code()
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// HTTP status the transport should use for this envelope
    pub fn http_status(&self) -> StatusCode {
        http_status_for(self.code)
    }
}

fn failure_kind(kind: ErrorKind) -> ErrorKind {
    match kind {
        ErrorKind::Success => ErrorKind::InternalServerError,
        other => other,
    }
}

/// Known kinds use their own mapping; other codes fall back on their range.
///
/// Only error statuses are passed through: informational, success and
/// redirect statuses may drop the body, and with it the envelope.
pub fn http_status_for(code: i32) -> StatusCode {
    if let Some(kind) = ErrorKind::from_code(code) {
        return kind.http_status();
    }
    match code {
        400..=599 => u16::try_from(code)
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        4000..=4999 => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let code = EnvelopeCode(self.code);

        let mut response = (status, Json(self)).into_response();
        response.extensions_mut().insert(code);
        response
    }
}
