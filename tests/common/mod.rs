use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lifecycle_api::app::build_router;
use lifecycle_api::state::AppState;
use lifecycle_api::store::memory::MemoryStore;

pub const SYSTEM_ADMIN_EMAIL: &str = "sysadmin@example.com";
pub const PASSWORD: &str = "correct horse battery";

/// Fresh router over an empty in-memory store. The state handle is returned
/// too so tests can seed records the API refuses to create.
static PIN_ENV: Once = Once::new();

#[allow(dead_code)]
pub fn test_app() -> (Router, AppState) {
    // Config is a process-wide singleton; pin the system-admin address once,
    // before anything touches it, so parallel tests never race the write
    PIN_ENV.call_once(|| std::env::set_var("SYSTEM_ADMIN_EMAIL", SYSTEM_ADMIN_EMAIL));
    let state = AppState::new(Arc::new(MemoryStore::new()));
    (build_router(state.clone()), state)
}

#[allow(dead_code)]
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register an account and return the response body (user, token, tenant).
#[allow(dead_code)]
pub async fn register(app: &Router, email: &str, name: &str) -> Value {
    register_with(
        app,
        json!({ "email": email, "password": PASSWORD, "name": name }),
    )
    .await
}

#[allow(dead_code)]
pub async fn register_with(app: &Router, payload: Value) -> Value {
    let (status, body) = request(app, Method::POST, "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body
}

#[allow(dead_code)]
pub fn token(session: &Value) -> &str {
    session["token"].as_str().expect("token in session body")
}

/// The caller's join key, read back from the tenant endpoint.
#[allow(dead_code)]
pub async fn tenant_key(app: &Router, token: &str) -> String {
    let (status, body) =
        request(app, Method::GET, "/api/tenants/current", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body["tenantKey"].as_str().expect("tenantKey").to_string()
}
