//! Router assembly. Public endpoints carry no auth middleware, the catalog
//! fallback resolves an identity when one is present, and everything else
//! sits behind the auth gate plus CSRF double-submit check.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{csrf_protection, optional_auth, require_auth};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", get(handlers::auth::logout))
        .route("/api/auth/google", get(handlers::oauth::google_redirect))
        .route(
            "/api/auth/google/callback",
            get(handlers::oauth::google_callback),
        );

    let catalog_fallback = Router::new()
        .route(
            "/api/technologies/public",
            get(handlers::technologies::public_list),
        )
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/technologies",
            get(handlers::technologies::list).post(handlers::technologies::create),
        )
        .route(
            "/api/technologies/:id",
            get(handlers::technologies::get)
                .put(handlers::technologies::update)
                .delete(handlers::technologies::delete),
        )
        .route(
            "/api/technologies/change-request",
            post(handlers::change_requests::submit),
        )
        .route(
            "/api/technologies/change-requests/my",
            get(handlers::change_requests::list_mine),
        )
        .route(
            "/api/technologies/change-requests/all",
            get(handlers::change_requests::list_all),
        )
        .route(
            "/api/technologies/change-requests/:id",
            put(handlers::change_requests::review),
        )
        .route(
            "/api/tenants",
            get(handlers::tenants::list)
                .post(handlers::tenants::create)
                .put(handlers::tenants::update),
        )
        .route("/api/tenants/current", get(handlers::tenants::current))
        .route("/api/tenants/join", post(handlers::tenants::join))
        .route(
            "/api/tenants/join-by-invitation",
            post(handlers::tenants::join_by_invitation),
        )
        .route(
            "/api/tenants/regenerate-key",
            post(handlers::tenants::regenerate_key),
        )
        .route("/api/tenants/users", get(handlers::tenants::users))
        .route(
            "/api/tenants/users/role",
            put(handlers::tenants::update_user_role),
        )
        .route(
            "/api/tenants/invitations",
            get(handlers::tenants::list_invitations).post(handlers::tenants::create_invitation),
        )
        .route(
            "/api/tenants/invitations/:id",
            delete(handlers::tenants::revoke_invitation),
        )
        .route("/api/tenants/leave", post(handlers::tenants::leave))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route_layer(from_fn(csrf_protection));

    Router::new()
        .merge(public)
        .merge(catalog_fallback)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "lifecycle-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
