//! Document store abstraction.
//!
//! The catalog, identity, tenant, invitation and change-request collections
//! live behind the [`Store`] trait: Postgres JSONB documents in production
//! ([`postgres::PgStore`]), an in-memory map for development and tests
//! ([`memory::MemoryStore`]).

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use models::{
    ChangeRequest, ChangeRequestStatus, Invitation, LifecycleStatus, RequestType, Role,
    Technology, TechnologyDraft, Tenant, User, Version,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation on the named field. Callers generating random
    /// keys/codes should regenerate and retry.
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    #[error("record not found")]
    NotFound,

    #[error("document serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations for all collections. Per-document writes are
/// atomic; `redeem_invitation` is the one multi-document unit and each
/// implementation must commit both halves or neither.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn list_users_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<User>>;
    async fn count_users(&self) -> StoreResult<i64>;
    async fn count_tenant_admins(&self, tenant_id: Uuid) -> StoreResult<i64>;

    // Tenants
    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()>;
    async fn find_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>>;
    async fn find_tenant_by_key(&self, key: &str) -> StoreResult<Option<Tenant>>;
    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>>;
    async fn update_tenant(&self, tenant: &Tenant) -> StoreResult<()>;
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    // Invitations
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;
    async fn find_unused_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>>;
    async fn list_invitations_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<Invitation>>;
    /// Delete an invitation only while unused; Err(NotFound) if absent,
    /// out of tenant scope, or already redeemed.
    async fn delete_unused_invitation(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Invitation>;
    /// Persist a redemption: the used-marked invitation and the reassigned
    /// user as a single logical unit. Fails with NotFound if the invitation
    /// was redeemed concurrently.
    async fn redeem_invitation(&self, invitation: &Invitation, user: &User) -> StoreResult<()>;

    // Technologies
    async fn insert_technology(&self, technology: &Technology) -> StoreResult<()>;
    async fn find_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Technology>>;
    /// `tenant_id = None` is the tenant-unfiltered public fallback.
    async fn list_technologies(&self, tenant_id: Option<Uuid>) -> StoreResult<Vec<Technology>>;
    async fn update_technology(&self, technology: &Technology) -> StoreResult<()>;
    async fn delete_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Technology>;

    // Change requests
    async fn insert_change_request(&self, request: &ChangeRequest) -> StoreResult<()>;
    async fn find_change_request(
        &self,
        id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<ChangeRequest>>;
    async fn list_change_requests(
        &self,
        tenant_id: Uuid,
        requested_by: Option<Uuid>,
    ) -> StoreResult<Vec<ChangeRequest>>;
    async fn update_change_request(&self, request: &ChangeRequest) -> StoreResult<()>;
}
