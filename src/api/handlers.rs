use axum::extract::State;
use axum::http::{Method, StatusCode};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::extract::{ValidJson, ValidQuery, Validate};
use crate::errors::{
    ApiError, ApiResult, BusinessError, ErrorKind, FieldErrors, ResponseEnvelope,
};
use crate::executor::{ExecutorStats, TaskExecutor};

pub const SERVICE_NAME: &str = "Uni-Research-Assistant";
const AUTHOR: &str = "wrench1024";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub executor: TaskExecutor,
    pub slow_delay: Duration,
    pub started_at: Instant,
}

/// Service status returned by the success demo
#[derive(Debug, Serialize, ToSchema)]
pub struct DemoStatus {
    pub message: String,
    pub timestamp: NaiveDateTime,
    pub status: String,
    pub version: String,
}

/// Echo query parameters
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EchoParams {
    /// Name to greet (default: "World")
    pub name: Option<String>,
}

impl Validate for EchoParams {}

#[derive(Debug, Serialize, ToSchema)]
pub struct EchoData {
    pub input: String,
    pub output: String,
    /// Length of the input in UTF-16 code units
    pub length: usize,
}

/// Age query parameters
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgeParams {
    /// Age in years, 0 to 150
    pub age: i32,
}

impl Validate for AgeParams {}

/// New user payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(self.age >= 0, "age", "age must be >=0");
        errors.check(self.age <= 150, "age", "age must be <=150");
        errors.check(!self.name.trim().is_empty(), "name", "name required");
        errors.check(
            self.name.encode_utf16().count() <= 32,
            "name",
            "name must be at most 32 characters",
        );
        if let Some(email) = &self.email {
            errors.check(email.contains('@'), "email", "email must contain '@'");
        }
        errors.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlowResult {
    pub message: String,
    pub duration: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub project_name: String,
    pub version: String,
    pub author: String,
    pub runtime: RuntimeInfo,
    pub os: OsInfo,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub processors: usize,
    pub uptime_seconds: u64,
    pub task_pool: ExecutorStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OsInfo {
    pub name: String,
    pub family: String,
    pub arch: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub version: String,
}

// Concrete envelope types for OpenAPI generation
/// Envelope without payload, used by every failure
#[derive(Debug, Serialize, ToSchema)]
pub struct EmptyEnvelope {
    /// 200 on success, otherwise an error kind code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Always null
    pub data: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Echo envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct EchoEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Option<EchoData>,
    pub timestamp: i64,
}

/// Demo status envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Option<DemoStatus>,
    pub timestamp: i64,
}

/// Created user envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct UserEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Option<UserData>,
    pub timestamp: i64,
}

/// Slow operation envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct SlowEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Option<SlowResult>,
    pub timestamp: i64,
}

/// System information envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct InfoEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Option<SystemInfo>,
    pub timestamp: i64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    )
)]
pub async fn health() -> ResponseEnvelope<HealthData> {
    ResponseEnvelope::success(HealthData {
        status: "UP".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Successful response sample
#[utoipa::path(
    get,
    path = "/api/demo/success",
    tag = "demo",
    responses(
        (status = 200, description = "Success envelope", body = StatusEnvelope)
    )
)]
pub async fn demo_success() -> ResponseEnvelope<DemoStatus> {
    info!("Success demo called");

    ResponseEnvelope::success(DemoStatus {
        message: format!("Hello, {}!", SERVICE_NAME),
        timestamp: Local::now().naive_local(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Echo a name back
#[utoipa::path(
    get,
    path = "/api/demo/echo",
    tag = "demo",
    params(EchoParams),
    responses(
        (status = 200, description = "Greeting", body = EchoEnvelope),
        (status = 400, description = "Malformed query string", body = EmptyEnvelope)
    )
)]
pub async fn demo_echo(ValidQuery(params): ValidQuery<EchoParams>) -> ResponseEnvelope<EchoData> {
    let name = params.name.unwrap_or_else(|| "World".to_string());
    info!(name = %name, "Echo demo called");

    ResponseEnvelope::success_with_message(
        "处理成功",
        EchoData {
            output: format!("Hello, {}!", name),
            length: name.encode_utf16().count(),
            input: name,
        },
    )
}

/// Raise a business error
#[utoipa::path(
    get,
    path = "/api/demo/error/biz",
    tag = "demo",
    responses(
        (status = 404, description = "Business error envelope (code 4001)", body = EmptyEnvelope)
    )
)]
pub async fn demo_business_error() -> ApiResult<()> {
    warn!("About to raise a business error");
    Err(BusinessError::with_message(ErrorKind::UserNotFound, "这是一个模拟的业务异常").into())
}

/// Raise an unclassified error
#[utoipa::path(
    get,
    path = "/api/demo/error/system",
    tag = "demo",
    responses(
        (status = 500, description = "Generic internal error envelope", body = EmptyEnvelope)
    )
)]
pub async fn demo_system_error() -> ApiResult<()> {
    warn!("About to raise a system error");
    Err(anyhow::anyhow!("这是一个模拟的系统异常").into())
}

/// Panic inside a handler
#[utoipa::path(
    get,
    path = "/api/demo/error/panic",
    tag = "demo",
    responses(
        (status = 500, description = "Generic internal error envelope", body = EmptyEnvelope)
    )
)]
pub async fn demo_panic() -> ResponseEnvelope<()> {
    warn!("About to panic");
    panic!("这是一个模拟的 panic");
}

/// Check an age parameter
#[utoipa::path(
    get,
    path = "/api/demo/error/param",
    tag = "demo",
    params(AgeParams),
    responses(
        (status = 200, description = "Age accepted", body = EmptyEnvelope),
        (status = 400, description = "Missing, malformed or out-of-range age", body = EmptyEnvelope)
    )
)]
pub async fn demo_param(ValidQuery(params): ValidQuery<AgeParams>) -> ApiResult<()> {
    if !(0..=150).contains(&params.age) {
        return Err(ApiError::illegal_argument(format!(
            "年龄参数不合法：{}",
            params.age
        )));
    }
    Ok(ResponseEnvelope::success_empty())
}

/// Validate and echo a new user
#[utoipa::path(
    post,
    path = "/api/demo/users",
    tag = "demo",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User accepted", body = UserEnvelope),
        (status = 400, description = "Validation or binding failure", body = EmptyEnvelope)
    )
)]
pub async fn demo_create_user(
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> ResponseEnvelope<UserData> {
    let user = UserData {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        age: request.age,
        email: request.email,
    };
    info!(id = %user.id, name = %user.name, "User accepted");

    ResponseEnvelope::success_with_message("创建成功", user)
}

/// Run a slow job on the task pool
#[utoipa::path(
    get,
    path = "/api/demo/slow",
    tag = "demo",
    responses(
        (status = 200, description = "Slow job finished", body = SlowEnvelope),
        (status = 500, description = "Task pool unavailable", body = EmptyEnvelope)
    )
)]
pub async fn demo_slow(State(state): State<AppState>) -> ApiResult<SlowResult> {
    let delay = state.slow_delay;
    info!(delay_ms = %delay.as_millis(), "Starting slow operation");

    state.executor.run(tokio::time::sleep(delay)).await?;

    info!("Slow operation finished");
    Ok(ResponseEnvelope::success(SlowResult {
        message: "耗时操作完成".to_string(),
        duration: format!("{}ms", delay.as_millis()),
    }))
}

/// Runtime and platform information
#[utoipa::path(
    get,
    path = "/api/demo/info",
    tag = "demo",
    responses(
        (status = 200, description = "System information", body = InfoEnvelope)
    )
)]
pub async fn demo_info(State(state): State<AppState>) -> ResponseEnvelope<SystemInfo> {
    let processors = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    ResponseEnvelope::success(SystemInfo {
        project_name: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        author: AUTHOR.to_string(),
        runtime: RuntimeInfo {
            processors,
            uptime_seconds: state.started_at.elapsed().as_secs(),
            task_pool: state.executor.stats(),
        },
        os: OsInfo {
            name: std::env::consts::OS.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> ResponseEnvelope<()> {
    ResponseEnvelope::fail_kind(ErrorKind::NotFound)
}

/// Fallback for a known path called with an unsupported method
pub async fn method_not_allowed(method: Method) -> ResponseEnvelope<()> {
    ResponseEnvelope::fail_code(
        StatusCode::METHOD_NOT_ALLOWED.as_u16().into(),
        format!("不支持的请求方法：{}", method),
    )
}
