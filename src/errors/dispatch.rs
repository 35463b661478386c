use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::fmt;
use thiserror::Error;
use tracing::error;

use super::business::BusinessError;
use super::codes::ErrorKind;
use super::response::ResponseEnvelope;
use crate::executor::ExecutorError;

/// A single field-level problem found while binding or validating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered collection of field errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record `message` against `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// All messages joined with `"; "`
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<F, M> FromIterator<(F, M)> for FieldErrors
where
    F: Into<String>,
    M: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (F, M)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, message) in iter {
            errors.push(field, message);
        }
        errors
    }
}

/// Every error a request handler can propagate
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pre-classified failure with a caller-safe message
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// Field validation of a request body failed
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The request could not be bound onto the handler's parameters
    #[error("binding failed: {0}")]
    Binding(FieldErrors),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// Anything else; its text never reaches the caller
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<ResponseEnvelope<T>, ApiError>;

impl ApiError {
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    /// Wrap a panic payload caught at the transport boundary
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Unclassified(anyhow::anyhow!("handler panicked: {}", detail))
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self::Business(kind.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Binding(FieldErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Binding(FieldErrors::single("query", rejection.body_text()))
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        Self::Unclassified(anyhow::Error::new(err))
    }
}

/// Single conversion point from a propagated error to an outbound envelope
pub struct ErrorDispatcher;

impl ErrorDispatcher {
    /// Classify `err` and build the failure envelope for it.
    ///
    /// Writes exactly one error-level log entry per call and holds no state,
    /// so dispatching the same error twice yields equal envelopes.
    pub fn dispatch<T>(err: &ApiError) -> ResponseEnvelope<T> {
        match err {
            ApiError::Business(e) if e.code() == ErrorKind::Success.code() => {
                error!(detail = %e.message(), "Business error raised with the success code");
                ResponseEnvelope::fail()
            }
            ApiError::Business(e) => {
                error!(code = e.code(), detail = %e.message(), "Business error");
                ResponseEnvelope::fail_code(e.code(), e.message())
            }
            ApiError::Validation(errors) => {
                let message = errors.joined();
                error!(errors = %message, "Request validation failed");
                ResponseEnvelope::fail_kind_with_message(ErrorKind::BadRequest, message)
            }
            ApiError::Binding(errors) => {
                let message = errors.joined();
                error!(errors = %message, "Request binding failed");
                ResponseEnvelope::fail_kind_with_message(ErrorKind::BadRequest, message)
            }
            ApiError::IllegalArgument(message) => {
                error!(detail = %message, "Illegal argument");
                ResponseEnvelope::fail_kind_with_message(ErrorKind::BadRequest, message.as_str())
            }
            ApiError::Unclassified(e) => {
                // Full chain (and backtrace, when captured) goes to the log only
                error!(error = ?e, "Unhandled error");
                ResponseEnvelope::fail()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorDispatcher::dispatch::<()>(&self).into_response()
    }
}

/// Response builder for `CatchPanicLayer`
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::from_panic(payload).into_response()
}
