use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Application-level result codes carried in every response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Normal completion
    Success,

    // Client errors
    /// Malformed or invalid input
    BadRequest,
    /// Missing or invalid credentials
    Unauthorized,
    /// Insufficient privilege
    Forbidden,
    /// Resource absent
    NotFound,

    // Business errors
    UserNotFound,
    UserAlreadyExists,
    WrongPassword,
    TokenExpired,
    TokenInvalid,
    DocumentNotFound,
    /// Document is still being processed asynchronously
    DocumentProcessing,

    // Server errors
    /// Unclassified failure
    InternalServerError,
    /// Upstream AI call failed
    AiServiceError,
    /// Persistence failure
    DatabaseError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 15] = [
        Self::Success,
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::UserNotFound,
        Self::UserAlreadyExists,
        Self::WrongPassword,
        Self::TokenExpired,
        Self::TokenInvalid,
        Self::DocumentNotFound,
        Self::DocumentProcessing,
        Self::InternalServerError,
        Self::AiServiceError,
        Self::DatabaseError,
    ];

    /// Numeric code placed in the envelope's `code` field
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 200,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::UserNotFound => 4001,
            Self::UserAlreadyExists => 4002,
            Self::WrongPassword => 4003,
            Self::TokenExpired => 4004,
            Self::TokenInvalid => 4005,
            Self::DocumentNotFound => 4101,
            Self::DocumentProcessing => 4102,
            Self::InternalServerError => 500,
            Self::AiServiceError => 5001,
            Self::DatabaseError => 5002,
        }
    }

    /// Message used when the raiser does not supply one
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Success => "操作成功",
            Self::BadRequest => "请求参数错误",
            Self::Unauthorized => "未授权，请先登录",
            Self::Forbidden => "权限不足，拒绝访问",
            Self::NotFound => "请求的资源不存在",
            Self::UserNotFound => "用户不存在",
            Self::UserAlreadyExists => "用户已存在",
            Self::WrongPassword => "密码错误",
            Self::TokenExpired => "Token 已过期",
            Self::TokenInvalid => "Token 无效",
            Self::DocumentNotFound => "文档不存在",
            Self::DocumentProcessing => "文档正在处理中",
            Self::InternalServerError => "服务器内部错误",
            Self::AiServiceError => "AI 服务调用失败",
            Self::DatabaseError => "数据库操作失败",
        }
    }

    /// Get HTTP status code for this kind
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::WrongPassword | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound | Self::UserNotFound | Self::DocumentNotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists | Self::DocumentProcessing => StatusCode::CONFLICT,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AiServiceError => StatusCode::BAD_GATEWAY,
            Self::DatabaseError => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Reverse lookup from a numeric code
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::UserNotFound => write!(f, "USER_NOT_FOUND"),
            Self::UserAlreadyExists => write!(f, "USER_ALREADY_EXISTS"),
            Self::WrongPassword => write!(f, "WRONG_PASSWORD"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::TokenInvalid => write!(f, "TOKEN_INVALID"),
            Self::DocumentNotFound => write!(f, "DOCUMENT_NOT_FOUND"),
            Self::DocumentProcessing => write!(f, "DOCUMENT_PROCESSING"),
            Self::InternalServerError => write!(f, "INTERNAL_SERVER_ERROR"),
            Self::AiServiceError => write!(f, "AI_SERVICE_ERROR"),
            Self::DatabaseError => write!(f, "DATABASE_ERROR"),
        }
    }
}
