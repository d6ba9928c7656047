//! Tenant membership and administration endpoints.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::policy::{self, Capability};
use crate::services::membership_service::MembershipService;
use crate::state::AppState;
use crate::store::models::Role;

#[derive(Debug, Deserialize)]
pub struct CreateTenantPayload {
    pub name: String,
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub tenant_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinByInvitationPayload {
    pub invitation_code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantPayload {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationPayload {
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub expires_in: Option<i64>,
}

pub async fn current(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = state
        .store
        .find_tenant(caller.tenant_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    Ok(Json(tenant))
}

/// Every tenant in the system. Gated on the configured system-admin address.
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::SystemAdmin)?;
    Ok(Json(state.store.list_tenants().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    let tenant = service.create_tenant(&payload.name, payload.domain).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": tenant.id,
            "name": tenant.name,
            "tenantKey": tenant.tenant_key,
            "domain": tenant.domain,
        })),
    ))
}

pub async fn join(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<JoinPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MembershipService::new(state.store.clone());
    let tenant = service.join_by_key(&caller, &payload.tenant_key).await?;
    Ok(Json(json!({
        "message": "Successfully joined tenant",
        "tenant": { "id": tenant.id, "name": tenant.name },
    })))
}

pub async fn join_by_invitation(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<JoinByInvitationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MembershipService::new(state.store.clone());
    let (tenant, role) = service
        .join_by_invitation(&caller, &payload.invitation_code)
        .await?;
    Ok(Json(json!({
        "message": "Successfully joined tenant",
        "tenant": { "id": tenant.id, "name": tenant.name },
        "role": role,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    let tenant = service
        .update_tenant(
            caller.tenant_id(),
            payload.name,
            payload.domain,
            payload.settings,
        )
        .await?;
    Ok(Json(tenant))
}

pub async fn regenerate_key(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    let tenant = service.regenerate_key(caller.tenant_id()).await?;
    Ok(Json(json!({
        "message": "Tenant key regenerated",
        "tenantKey": tenant.tenant_key,
    })))
}

pub async fn users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let users = state.store.list_users_by_tenant(caller.tenant_id()).await?;
    let users: Vec<Value> = users.iter().map(|u| u.profile()).collect();
    Ok(Json(users))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    let user = service
        .update_user_role(caller.tenant_id(), payload.user_id, payload.role)
        .await?;
    Ok(Json(user.profile()))
}

pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateInvitationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    let invitation = service
        .create_invitation(
            &caller,
            &payload.email,
            payload.role.unwrap_or(Role::User),
            payload.expires_in,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    Ok(Json(service.list_invitations(caller.tenant_id()).await?))
}

pub async fn revoke_invitation(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = MembershipService::new(state.store.clone());
    service.revoke_invitation(caller.tenant_id(), id).await?;
    Ok(Json(json!({ "message": "Invitation revoked" })))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MembershipService::new(state.store.clone());
    let tenant = service.leave(&caller).await?;
    Ok(Json(json!({
        "message": "Successfully left organization",
        "defaultTenant": { "id": tenant.id, "name": tenant.name },
    })))
}
