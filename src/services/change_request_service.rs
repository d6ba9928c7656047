//! Change-request workflow: submission by any member, review by admins,
//! approved requests applied to the catalog with the reviewer as the actor.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::services::catalog_service::CatalogService;
use crate::store::models::{ChangeRequest, ChangeRequestStatus, RequestType, TechnologyDraft};
use crate::store::Store;

pub struct ChangeRequestService {
    store: Arc<dyn Store>,
    catalog: CatalogService,
}

pub struct SubmitInput {
    pub request_type: RequestType,
    pub technology: Option<Uuid>,
    pub requested_changes: Value,
    pub comments: Option<String>,
}

impl ChangeRequestService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let catalog = CatalogService::new(store.clone());
        Self { store, catalog }
    }

    pub async fn submit(
        &self,
        caller: &AuthUser,
        input: SubmitInput,
    ) -> Result<ChangeRequest, ApiError> {
        match input.request_type {
            RequestType::Create => {
                // Fail early on payloads that could never be applied
                let draft: TechnologyDraft =
                    serde_json::from_value(input.requested_changes.clone()).map_err(|e| {
                        ApiError::bad_request(format!("Invalid technology payload: {e}"))
                    })?;
                let preview = crate::store::models::Technology::from_draft(
                    draft,
                    caller.tenant_id(),
                    Some(caller.id()),
                );
                preview.validate().map_err(ApiError::bad_request)?;
            }
            RequestType::Update | RequestType::Delete => {
                let id = input
                    .technology
                    .ok_or_else(|| ApiError::bad_request("technology is required"))?;
                // Confirm the target exists within the caller's tenant
                self.catalog.get(id, caller.tenant_id()).await?;
                if input.request_type == RequestType::Update
                    && !input.requested_changes.is_object()
                {
                    return Err(ApiError::bad_request("requestedChanges must be a JSON object"));
                }
            }
        }

        let request = ChangeRequest::new(
            input.technology,
            input.request_type,
            input.requested_changes,
            input.comments,
            caller.id(),
            caller.tenant_id(),
        );
        self.store.insert_change_request(&request).await?;
        Ok(request)
    }

    /// Requests submitted by the caller, newest first.
    pub async fn list_mine(&self, caller: &AuthUser) -> Result<Vec<Value>, ApiError> {
        let requests = self
            .store
            .list_change_requests(caller.tenant_id(), Some(caller.id()))
            .await?;
        self.populate(requests).await
    }

    /// All requests in the tenant, for the admin review queue.
    pub async fn list_all(&self, tenant_id: Uuid) -> Result<Vec<Value>, ApiError> {
        let requests = self.store.list_change_requests(tenant_id, None).await?;
        self.populate(requests).await
    }

    /// Approve or reject a pending request. Approval applies the proposed
    /// change to the catalog, attributing the mutation to the reviewer. The
    /// decision is recorded before the apply so a reviewed request can never
    /// be reviewed again, even if the apply fails.
    pub async fn review(
        &self,
        reviewer: &AuthUser,
        request_id: Uuid,
        approve: bool,
        comments: Option<String>,
    ) -> Result<ChangeRequest, ApiError> {
        let mut request = self
            .store
            .find_change_request(request_id, reviewer.tenant_id())
            .await?
            .ok_or_else(|| ApiError::not_found("Change request not found"))?;

        if !request.is_pending() {
            return Err(ApiError::invalid_state(
                "Change request has already been reviewed",
            ));
        }

        request.status = if approve {
            ChangeRequestStatus::Approved
        } else {
            ChangeRequestStatus::Rejected
        };
        request.reviewed_by = Some(reviewer.id());
        if comments.is_some() {
            request.comments = comments;
        }
        request.updated_at = Utc::now();
        self.store.update_change_request(&request).await?;

        if approve {
            if let Err(e) = self.apply(&request, reviewer.id()).await {
                error!(
                    request_id = %request.id,
                    error = %e.message(),
                    "approved change request could not be applied"
                );
                return Err(e);
            }
        }

        Ok(request)
    }

    async fn apply(&self, request: &ChangeRequest, reviewer: Uuid) -> Result<(), ApiError> {
        match request.request_type {
            RequestType::Create => {
                let draft: TechnologyDraft =
                    serde_json::from_value(request.requested_changes.clone()).map_err(|e| {
                        ApiError::bad_request(format!("Invalid technology payload: {e}"))
                    })?;
                self.catalog
                    .create(draft, request.tenant_id, Some(reviewer))
                    .await?;
            }
            RequestType::Update => {
                let id = request
                    .technology
                    .ok_or_else(|| ApiError::bad_request("technology is required"))?;
                self.catalog
                    .update(
                        id,
                        request.tenant_id,
                        request.requested_changes.clone(),
                        Some(reviewer),
                    )
                    .await?;
            }
            RequestType::Delete => {
                let id = request
                    .technology
                    .ok_or_else(|| ApiError::bad_request("technology is required"))?;
                self.catalog.delete(id, request.tenant_id).await?;
            }
        }
        Ok(())
    }

    /// Expand stored ids into display-ready documents: the target technology
    /// record plus name/email references for requester and reviewer.
    async fn populate(&self, requests: Vec<ChangeRequest>) -> Result<Vec<Value>, ApiError> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            let mut doc = serde_json::to_value(&request)
                .map_err(|_| ApiError::internal_server_error("Failed to serialize request"))?;

            if let Some(tech_id) = request.technology {
                if let Some(tech) = self
                    .store
                    .find_technology(tech_id, request.tenant_id)
                    .await?
                {
                    doc["technology"] = serde_json::to_value(&tech).map_err(|_| {
                        ApiError::internal_server_error("Failed to serialize technology")
                    })?;
                }
            }
            if let Some(user) = self.store.find_user(request.requested_by).await? {
                doc["requestedBy"] = user.reference();
            }
            if let Some(reviewer_id) = request.reviewed_by {
                if let Some(user) = self.store.find_user(reviewer_id).await? {
                    doc["reviewedBy"] = user.reference();
                }
            }
            out.push(doc);
        }
        Ok(out)
    }
}
