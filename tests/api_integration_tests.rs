use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower::Service;

// Helper to create test app
fn create_test_app() -> axum::Router {
    use std::sync::Arc;
    use std::time::Instant;
    use uni_research::{api, config, executor};

    let mut config = config::Config::default();
    config.task_pool = executor::TaskPoolConfig {
        core_size: 2,
        max_size: 4,
        queue_capacity: 8,
        name_prefix: "test-task-".to_string(),
        wait_for_tasks_on_shutdown: true,
        await_termination: Duration::from_secs(5),
    };
    config.demo.slow_delay = Duration::from_millis(10);

    let state = Arc::new(api::handlers::AppStateInner {
        executor: executor::TaskExecutor::new(config.task_pool.clone()),
        slow_delay: config.demo.slow_delay,
        started_at: Instant::now(),
    });

    api::routes::create_router(state, &config.cors)
}

async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(json!({}))
}

// Helper to send request and parse JSON response
async fn send_json_request(app: &mut axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status = response.status();

    (status, read_json(response).await)
}

// Helper to send JSON request with JSON body
async fn send_json_body_request(
    app: &mut axum::Router,
    method: &str,
    uri: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status = response.status();

    (status, read_json(response).await)
}

fn assert_envelope_shape(body: &Value) {
    assert!(body["code"].is_i64(), "missing code: {}", body);
    assert!(body["message"].is_string(), "missing message: {}", body);
    assert!(body.get("data").is_some(), "missing data: {}", body);
    assert!(body["timestamp"].is_i64(), "missing timestamp: {}", body);
}

#[tokio::test]
async fn test_health_endpoint() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_envelope_shape(&body);
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["status"], "UP");
    assert_eq!(body["data"]["service"], "Uni-Research-Assistant");
}

#[tokio::test]
async fn test_demo_success() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/success").await;

    assert_eq!(status, StatusCode::OK);
    assert_envelope_shape(&body);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "操作成功");
    assert_eq!(body["data"]["status"], "running");
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_demo_echo_default_name() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/echo").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "处理成功");
    assert_eq!(body["data"]["input"], "World");
    assert_eq!(body["data"]["output"], "Hello, World!");
    assert_eq!(body["data"]["length"], 5);
}

#[tokio::test]
async fn test_demo_echo_with_name() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/echo?name=Rust").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["output"], "Hello, Rust!");
    assert_eq!(body["data"]["length"], 4);
}

#[tokio::test]
async fn test_business_error_envelope() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/error/biz").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope_shape(&body);
    assert_eq!(body["code"], 4001);
    assert_eq!(body["message"], "这是一个模拟的业务异常");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_system_error_is_opaque() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/error/system").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["message"], "服务器内部错误");
    assert!(body["data"].is_null());
    assert!(!body.to_string().contains("模拟的系统异常"));
}

#[tokio::test]
async fn test_panic_is_dispatched_as_internal_error() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/error/panic").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_envelope_shape(&body);
    assert_eq!(body["code"], 500);
    assert_eq!(body["message"], "服务器内部错误");
    assert!(!body.to_string().contains("panic"));
}

#[tokio::test]
async fn test_param_out_of_range() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/error/param?age=-1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["message"], "年龄参数不合法：-1");
}

#[tokio::test]
async fn test_param_in_range() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/error/param?age=30").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_param_missing_or_malformed_is_binding_error() {
    let mut app = create_test_app();

    for uri in ["/api/demo/error/param", "/api/demo/error/param?age=abc"] {
        let (status, body) = send_json_request(&mut app, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
        assert_eq!(body["code"], 400);
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn test_create_user() {
    let mut app = create_test_app();
    let (status, body) = send_json_body_request(
        &mut app,
        "POST",
        "/api/demo/users",
        r#"{"name": " Ada ", "age": 36, "email": "ada@example.com"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "创建成功");
    assert_eq!(body["data"]["name"], "Ada");
    assert_eq!(body["data"]["age"], 36);
    assert!(body["data"]["id"].is_string());
}

#[tokio::test]
async fn test_create_user_validation_errors_are_joined() {
    let mut app = create_test_app();
    let (status, body) = send_json_body_request(
        &mut app,
        "POST",
        "/api/demo/users",
        r#"{"name": "", "age": -1}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["message"], "age must be >=0; name required");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_create_user_malformed_json() {
    let mut app = create_test_app();
    let (status, body) =
        send_json_body_request(&mut app, "POST", "/api/demo/users", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_slow_runs_on_task_pool() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/slow").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "耗时操作完成");
    assert_eq!(body["data"]["duration"], "10ms");
}

#[tokio::test]
async fn test_info_reports_task_pool() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["projectName"], "Uni-Research-Assistant");
    assert!(body["data"]["runtime"]["processors"].as_u64().unwrap() >= 1);
    assert_eq!(body["data"]["runtime"]["taskPool"]["core_size"], 2);
    assert_eq!(body["data"]["runtime"]["taskPool"]["max_size"], 4);
    assert!(body["data"]["os"]["arch"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_not_found_envelope() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "请求的资源不存在");
}

#[tokio::test]
async fn test_wrong_method_returns_envelope() {
    let mut app = create_test_app();

    let (status, body) = send_json_request(&mut app, "GET", "/api/demo/users").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_envelope_shape(&body);
    assert_eq!(body["code"], 405);
    assert!(body["data"].is_null());

    let (status, body) = send_json_request(&mut app, "DELETE", "/api/health").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], 405);
}

#[tokio::test]
async fn test_demo_echo_counts_utf16_units() {
    let mut app = create_test_app();
    let (status, body) =
        send_json_request(&mut app, "GET", "/api/demo/echo?name=%F0%9F%98%80").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["input"], "😀");
    assert_eq!(body["data"]["length"], 2);
}

#[tokio::test]
async fn test_request_id_header() {
    let mut app = create_test_app();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn test_cors_preflight() {
    let mut app = create_test_app();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/demo/echo")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
    assert_eq!(headers.get("access-control-max-age").unwrap(), "3600");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let mut app = create_test_app();
    let _ = send_json_request(&mut app, "GET", "/api/health").await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("api_responses_total"));
}

#[tokio::test]
async fn test_unmatched_paths_share_one_metrics_series() {
    let mut app = create_test_app();
    for i in 0..3 {
        let (status, _) =
            send_json_request(&mut app, "GET", &format!("/api/scan-target-{}", i)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(!text.contains("scan-target"));
    assert!(text.contains(r#"path="unmatched""#));
}

#[tokio::test]
async fn test_openapi_document() {
    let mut app = create_test_app();
    let (status, body) = send_json_request(&mut app, "GET", "/api/doc/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/demo/echo"].is_object());
    assert!(body["paths"]["/api/demo/users"]["post"].is_object());
    assert!(body["components"]["schemas"]["EmptyEnvelope"].is_object());
}
