//! Tenant-scoped technology catalog CRUD.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::models::{Technology, TechnologyDraft};
use crate::store::Store;

/// Fields a patch may never touch. Identity and provenance are set by the
/// server, not the client.
const PROTECTED_FIELDS: [&str; 4] = ["id", "tenantId", "createdBy", "createdAt"];

pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        draft: TechnologyDraft,
        tenant_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Technology, ApiError> {
        let technology = Technology::from_draft(draft, tenant_id, actor);
        technology.validate().map_err(ApiError::bad_request)?;
        self.store.insert_technology(&technology).await?;
        Ok(technology)
    }

    pub async fn get(&self, id: Uuid, tenant_id: Uuid) -> Result<Technology, ApiError> {
        self.store
            .find_technology(id, tenant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Technology not found"))
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Technology>, ApiError> {
        Ok(self.store.list_technologies(Some(tenant_id)).await?)
    }

    /// Catalog across all tenants, for the unauthenticated read-only view.
    pub async fn list_public(&self) -> Result<Vec<Technology>, ApiError> {
        Ok(self.store.list_technologies(None).await?)
    }

    /// Shallow-merge a JSON patch over the stored record. Identity fields
    /// are stripped from the patch before merging, and the result must still
    /// pass validation.
    pub async fn update(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        patch: Value,
        actor: Option<Uuid>,
    ) -> Result<Technology, ApiError> {
        let existing = self.get(id, tenant_id).await?;
        let updated = apply_patch(&existing, patch, actor)?;
        updated.validate().map_err(ApiError::bad_request)?;
        self.store.update_technology(&updated).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, tenant_id: Uuid) -> Result<Technology, ApiError> {
        use crate::store::StoreError;
        match self.store.delete_technology(id, tenant_id).await {
            Ok(technology) => Ok(technology),
            Err(StoreError::NotFound) => Err(ApiError::not_found("Technology not found")),
            Err(e) => Err(e.into()),
        }
    }
}

fn apply_patch(
    existing: &Technology,
    patch: Value,
    actor: Option<Uuid>,
) -> Result<Technology, ApiError> {
    let Value::Object(patch) = patch else {
        return Err(ApiError::bad_request("Update payload must be a JSON object"));
    };

    let mut doc = serde_json::to_value(existing)
        .map_err(|_| ApiError::internal_server_error("Failed to serialize technology"))?;
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| ApiError::internal_server_error("Failed to serialize technology"))?;

    for (key, value) in patch {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        obj.insert(key, value);
    }

    let mut updated: Technology = serde_json::from_value(doc)
        .map_err(|e| ApiError::bad_request(format!("Invalid technology payload: {e}")))?;
    updated.id = existing.id;
    updated.tenant_id = existing.tenant_id;
    updated.created_by = existing.created_by;
    updated.created_at = existing.created_at;
    updated.updated_by = actor;
    updated.updated_at = Utc::now();
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Technology {
        let draft: TechnologyDraft = serde_json::from_value(json!({
            "name": "PostgreSQL",
            "description": "Relational database",
            "vendor": "PostgreSQL Global Development Group",
            "capability": "Data storage",
            "startDate": "1996-09-01",
            "versions": [{
                "versionNumber": "16",
                "releaseDate": "2023-09-14",
                "lifecycleStatus": "Active"
            }]
        }))
        .unwrap();
        Technology::from_draft(draft, Uuid::new_v4(), Some(Uuid::new_v4()))
    }

    #[test]
    fn patch_merges_scalar_fields() {
        let tech = sample();
        let updated =
            apply_patch(&tech, json!({"description": "RDBMS"}), tech.updated_by).unwrap();
        assert_eq!(updated.description, "RDBMS");
        assert_eq!(updated.name, "PostgreSQL");
    }

    #[test]
    fn patch_cannot_move_tenants() {
        let tech = sample();
        let foreign = Uuid::new_v4();
        let updated = apply_patch(&tech, json!({"tenantId": foreign}), None).unwrap();
        assert_eq!(updated.tenant_id, tech.tenant_id);
    }

    #[test]
    fn patch_preserves_provenance() {
        let tech = sample();
        let updated = apply_patch(
            &tech,
            json!({"id": Uuid::new_v4(), "createdBy": Uuid::new_v4(), "name": "Postgres"}),
            None,
        )
        .unwrap();
        assert_eq!(updated.id, tech.id);
        assert_eq!(updated.created_by, tech.created_by);
        assert_eq!(updated.name, "Postgres");
    }

    #[test]
    fn non_object_patch_rejected() {
        let tech = sample();
        let err = apply_patch(&tech, json!("nope"), None).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
