use utoipa::OpenApi;

use crate::api::handlers::{
    CreateUserRequest, DemoStatus, EchoData, EchoEnvelope, EmptyEnvelope, HealthData,
    InfoEnvelope, OsInfo, RuntimeInfo, SlowEnvelope, SlowResult, StatusEnvelope, SystemInfo,
    UserData, UserEnvelope,
};
use crate::errors::ErrorKind;
use crate::executor::ExecutorStats;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Uni-Research-Assistant API",
        version = "0.1.0",
        description = "Backend skeleton. Every endpoint answers with a uniform envelope {code, message, data, timestamp}; failures carry an error kind code and a caller-safe message.",
        contact(
            name = "wrench1024",
        )
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::demo_success,
        crate::api::handlers::demo_echo,
        crate::api::handlers::demo_business_error,
        crate::api::handlers::demo_system_error,
        crate::api::handlers::demo_panic,
        crate::api::handlers::demo_param,
        crate::api::handlers::demo_create_user,
        crate::api::handlers::demo_slow,
        crate::api::handlers::demo_info,
    ),
    components(
        schemas(
            ErrorKind,
            EmptyEnvelope,
            EchoEnvelope,
            StatusEnvelope,
            UserEnvelope,
            SlowEnvelope,
            InfoEnvelope,
            DemoStatus,
            EchoData,
            CreateUserRequest,
            UserData,
            SlowResult,
            SystemInfo,
            RuntimeInfo,
            OsInfo,
            HealthData,
            ExecutorStats,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "demo", description = "Endpoints exercising the response envelope and error dispatch"),
    )
)]
pub struct ApiDoc;
