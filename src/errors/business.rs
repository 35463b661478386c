use thiserror::Error;

use super::codes::ErrorKind;

/// Intentionally raised, pre-classified failure.
///
/// The message is returned to the caller verbatim, so raisers must only put
/// user-facing text in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessError {
    code: i32,
    message: String,
}

impl BusinessError {
    /// Raise with a message only; the code defaults to `InternalServerError`
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(ErrorKind::InternalServerError.code(), message)
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::with_code(kind.code(), kind.default_message())
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_code(kind.code(), message)
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The taxonomy entry behind this error, if the code is a known one
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code)
    }
}

impl From<ErrorKind> for BusinessError {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}
