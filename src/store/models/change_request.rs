use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A proposed create/update/delete against the catalog. Status transitions
/// exactly once, from `pending` to either terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: Uuid,
    /// Target technology; absent for `create` requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<Uuid>,
    pub request_type: RequestType,
    /// Proposed payload: a full draft for `create`, a field patch for
    /// `update`, ignored for `delete`
    pub requested_changes: Value,
    pub status: ChangeRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub requested_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Uuid>,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeRequest {
    pub fn new(
        technology: Option<Uuid>,
        request_type: RequestType,
        requested_changes: Value,
        comments: Option<String>,
        requested_by: Uuid,
        tenant_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            technology,
            request_type,
            requested_changes,
            status: ChangeRequestStatus::Pending,
            comments,
            requested_by,
            reviewed_by: None,
            tenant_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeRequestStatus::Pending
    }
}
