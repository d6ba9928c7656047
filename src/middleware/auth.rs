//! Authentication gate: resolve a bearer credential to a fresh user record.
//!
//! Two modes: [`require_auth`] fails the request with 401 when the token is
//! absent, malformed, expired, or references a deleted user; [`optional_auth`]
//! continues with no identity attached on any failure (public-fallback
//! endpoints).

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::validate_token;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::models::User;

/// Name of the session cookie mirroring the bearer header.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller attached to the request context.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn tenant_id(&self) -> uuid::Uuid {
        self.user.tenant_id
    }
}

/// Mandatory authentication middleware.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = resolve_caller(&state, request.headers())
        .await
        .map_err(ApiError::unauthorized)?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Optional authentication middleware: attaches `AuthUser` when a valid
/// credential is present, otherwise continues unauthenticated.
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Ok(caller) = resolve_caller(&state, request.headers()).await {
        request.extensions_mut().insert(caller);
    }
    next.run(request).await
}

async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, String> {
    let token = extract_token(headers).ok_or_else(|| "Authentication required".to_string())?;
    let claims = validate_token(&token)?;

    // Fresh lookup so deleted users and stale tenant assignments fail closed
    let user = state
        .store
        .find_user(claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed during authentication: {}", e);
            "Authentication failed".to_string()
        })?
        .ok_or_else(|| "User not found".to_string())?;

    Ok(AuthUser { user })
}

/// Extract the credential from the Authorization header or the session
/// cookie, in that order.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }
    cookie_value(headers, TOKEN_COOKIE)
}

/// Pull a single value out of the Cookie header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_header_wins() {
        let mut headers = headers_with("authorization", "Bearer abc123");
        headers.insert("cookie", HeaderValue::from_static("token=fromcookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let headers = headers_with("cookie", "csrf_token=x; token=sess; other=1");
        assert_eq!(extract_token(&headers).as_deref(), Some("sess"));
    }

    #[test]
    fn empty_bearer_is_ignored() {
        let headers = headers_with("authorization", "Bearer ");
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn missing_everything_yields_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_parsing_handles_whitespace() {
        let headers = headers_with("cookie", " a=1 ;  token=zzz");
        assert_eq!(cookie_value(&headers, "token").as_deref(), Some("zzz"));
        assert_eq!(cookie_value(&headers, "a").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "b"), None);
    }
}
