//! Registration, login, logout and session readback.

use axum::extract::{Extension, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::config;
use crate::error::ApiError;
use crate::keygen;
use crate::middleware::auth::{AuthUser, TOKEN_COOKIE};
use crate::middleware::csrf::CSRF_COOKIE;
use crate::services::account_service::{AccountService, AuthOutcome, RegisterInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub name: String,
    pub tenant_key: Option<String>,
    pub organization_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Build the Set-Cookie headers for a fresh session: the HttpOnly token
/// cookie plus a client-readable CSRF token for the double-submit check.
pub(crate) fn session_cookies(token: &str) -> AppendHeaders<Vec<(axum::http::HeaderName, String)>> {
    let cfg = config::config();
    let max_age = cfg.security.jwt_expiry_hours * 3600;
    let attrs = cookie_attributes(max_age);
    AppendHeaders(vec![
        (SET_COOKIE, format!("{TOKEN_COOKIE}={token}; HttpOnly{attrs}")),
        (SET_COOKIE, format!("{CSRF_COOKIE}={}{attrs}", keygen::csrf_token())),
    ])
}

fn clear_cookies() -> AppendHeaders<Vec<(axum::http::HeaderName, String)>> {
    let attrs = cookie_attributes(0);
    AppendHeaders(vec![
        (SET_COOKIE, format!("{TOKEN_COOKIE}=; HttpOnly{attrs}")),
        (SET_COOKIE, format!("{CSRF_COOKIE}={attrs}")),
    ])
}

fn cookie_attributes(max_age: u64) -> String {
    let cfg = config::config();
    let mut attrs = format!("; Path=/; Max-Age={max_age}");
    if cfg.is_production() {
        // Cross-site cookies for a separately hosted front end
        attrs.push_str("; Secure; SameSite=None");
    } else {
        attrs.push_str("; SameSite=Lax");
    }
    if let Some(domain) = &cfg.security.cookie_domain {
        attrs.push_str("; Domain=");
        attrs.push_str(domain);
    }
    attrs
}

fn session_body(outcome: &AuthOutcome) -> serde_json::Value {
    json!({
        "user": outcome.user.profile(),
        "token": outcome.token,
        "tenant": {
            "id": outcome.tenant.id,
            "name": outcome.tenant.name,
        },
        "isFirstUser": outcome.is_first_user,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AccountService::new(state.store.clone());
    let outcome = service
        .register(RegisterInput {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            tenant_key: payload.tenant_key,
            organization_name: payload.organization_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        session_cookies(&outcome.token),
        Json(session_body(&outcome)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AccountService::new(state.store.clone());
    let outcome = service.login(&payload.email, &payload.password).await?;

    Ok((
        session_cookies(&outcome.token),
        Json(json!({
            "user": outcome.user.profile(),
            "token": outcome.token,
            "tenant": {
                "id": outcome.tenant.id,
                "name": outcome.tenant.name,
            },
        })),
    ))
}

pub async fn logout() -> impl IntoResponse {
    (clear_cookies(), Json(json!({ "message": "Logged out" })))
}

pub async fn me(Extension(caller): Extension<AuthUser>) -> Json<serde_json::Value> {
    Json(caller.user.profile())
}
