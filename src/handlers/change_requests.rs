//! Change-request submission, listing and review endpoints.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::policy::{self, Capability};
use crate::services::change_request_service::{ChangeRequestService, SubmitInput};
use crate::state::AppState;
use crate::store::models::RequestType;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub technology_id: Option<Uuid>,
    pub request_type: RequestType,
    #[serde(default)]
    pub requested_changes: Value,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub status: String,
    pub comments: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<SubmitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ChangeRequestService::new(state.store.clone());
    let request = service
        .submit(
            &caller,
            SubmitInput {
                request_type: payload.request_type,
                technology: payload.technology_id,
                requested_changes: payload.requested_changes,
                comments: payload.comments,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ChangeRequestService::new(state.store.clone());
    Ok(Json(service.list_mine(&caller).await?))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let service = ChangeRequestService::new(state.store.clone());
    Ok(Json(service.list_all(caller.tenant_id()).await?))
}

pub async fn review(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    policy::authorize(&caller, Capability::TenantAdmin)?;
    let approve = match payload.status.as_str() {
        "approved" => true,
        "rejected" => false,
        other => {
            return Err(ApiError::bad_request(format!(
                "status must be 'approved' or 'rejected', got '{other}'"
            )))
        }
    };
    let service = ChangeRequestService::new(state.store.clone());
    let request = service.review(&caller, id, approve, payload.comments).await?;
    Ok(Json(request))
}
