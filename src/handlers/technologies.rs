//! Tenant-scoped catalog endpoints plus the unauthenticated public listing.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::policy::{self, Capability};
use crate::services::catalog_service::CatalogService;
use crate::state::AppState;
use crate::store::models::TechnologyDraft;

/// Unauthenticated fallback listing. When a valid session is attached the
/// result is scoped to the caller's tenant; otherwise the whole catalog is
/// returned read-only.
pub async fn public_list(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.store.clone());
    let technologies = match caller {
        Some(Extension(caller)) => service.list(caller.tenant_id()).await?,
        None => service.list_public().await?,
    };
    Ok(Json(technologies))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.store.clone());
    Ok(Json(service.list(caller.tenant_id()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CatalogService::new(state.store.clone());
    Ok(Json(service.get(id, caller.tenant_id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(draft): Json<TechnologyDraft>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = CatalogService::new(state.store.clone());
    let technology = service
        .create(draft, caller.tenant_id(), Some(caller.id()))
        .await?;
    Ok((StatusCode::CREATED, Json(technology)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = CatalogService::new(state.store.clone());
    let technology = service
        .update(id, caller.tenant_id(), patch, Some(caller.id()))
        .await?;
    Ok(Json(technology))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = CatalogService::new(state.store.clone());
    service.delete(id, caller.tenant_id()).await?;
    Ok(Json(json!({ "message": "Technology deleted" })))
}
