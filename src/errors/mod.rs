//! Unified response envelope and error dispatch

pub mod business;
pub mod codes;
pub mod dispatch;
pub mod response;

pub use business::BusinessError;
pub use codes::ErrorKind;
pub use dispatch::{ApiError, ApiResult, ErrorDispatcher, FieldError, FieldErrors};
pub use response::{EnvelopeCode, ResponseEnvelope};
