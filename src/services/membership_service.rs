//! Tenant membership workflow: join by key, join by invitation, create and
//! leave organizations, invitation issuance/revocation, role management.

use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::keygen;
use crate::middleware::auth::AuthUser;
use crate::store::models::{Invitation, Role, Tenant, User, DEFAULT_TENANT_NAME};
use crate::store::{Store, StoreError};

pub struct MembershipService {
    store: Arc<dyn Store>,
}

/// Create a tenant with a freshly generated join-key, retrying on the
/// (unlikely) key collision.
pub(crate) async fn create_organization(
    store: &Arc<dyn Store>,
    name: &str,
    domain: Option<String>,
) -> Result<Tenant, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Organization name is required"));
    }
    for _ in 0..keygen::MAX_KEY_ATTEMPTS {
        let tenant = Tenant::new(name.trim().to_string(), keygen::tenant_key(), domain.clone());
        match store.insert_tenant(&tenant).await {
            Ok(()) => return Ok(tenant),
            Err(StoreError::Duplicate("tenantKey")) => continue,
            Err(StoreError::Duplicate("domain")) => {
                return Err(ApiError::conflict("Domain is already claimed by another organization"))
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::internal_server_error(
        "Could not allocate a unique organization key",
    ))
}

/// Find the well-known Default tenant, creating it lazily.
pub(crate) async fn default_tenant(store: &Arc<dyn Store>) -> Result<Tenant, ApiError> {
    if let Some(tenant) = store.find_tenant_by_name(DEFAULT_TENANT_NAME).await? {
        return Ok(tenant);
    }
    create_organization(store, DEFAULT_TENANT_NAME, None).await
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Join a tenant using its shared join-key. Role is left unchanged.
    pub async fn join_by_key(&self, caller: &AuthUser, key: &str) -> Result<Tenant, ApiError> {
        let tenant = self
            .store
            .find_tenant_by_key(key)
            .await?
            .ok_or_else(|| ApiError::not_found("Invalid tenant key"))?;

        let mut user = caller.user.clone();
        user.tenant_id = tenant.id;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        Ok(tenant)
    }

    /// Redeem a single-use invitation code: assigns the invitation's tenant
    /// and granted role, and marks the code used, as one logical unit.
    pub async fn join_by_invitation(
        &self,
        caller: &AuthUser,
        code: &str,
    ) -> Result<(Tenant, Role), ApiError> {
        let mut invitation = self
            .store
            .find_unused_invitation_by_code(code)
            .await?
            .ok_or_else(|| ApiError::not_found("Invalid or expired invitation code"))?;

        let now = Utc::now();
        if invitation.is_expired(now) {
            return Err(ApiError::invalid_state("Invitation has expired"));
        }

        let tenant = self
            .store
            .find_tenant(invitation.tenant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

        let mut user = caller.user.clone();
        user.tenant_id = tenant.id;
        user.role = invitation.role;
        user.updated_at = now;
        invitation.mark_used(user.id, now);

        match self.store.redeem_invitation(&invitation, &user).await {
            Ok(()) => Ok((tenant, user.role)),
            // Redeemed out from under us between lookup and commit
            Err(StoreError::NotFound) => {
                Err(ApiError::not_found("Invalid or expired invitation code"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit organization creation by a tenant admin.
    pub async fn create_tenant(
        &self,
        name: &str,
        domain: Option<String>,
    ) -> Result<Tenant, ApiError> {
        create_organization(&self.store, name, domain).await
    }

    /// Partial update of the caller's tenant (name, domain, settings bag).
    pub async fn update_tenant(
        &self,
        tenant_id: Uuid,
        name: Option<String>,
        domain: Option<String>,
        settings: Option<Value>,
    ) -> Result<Tenant, ApiError> {
        let mut tenant = self
            .store
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(ApiError::bad_request("Organization name is required"));
            }
            tenant.name = name.trim().to_string();
        }
        if let Some(domain) = domain {
            tenant.domain = Some(domain.to_lowercase());
        }
        if let Some(settings) = settings {
            tenant.settings = settings;
        }

        match self.store.update_tenant(&tenant).await {
            Ok(()) => Ok(tenant),
            Err(StoreError::Duplicate("domain")) => Err(ApiError::conflict(
                "Domain is already claimed by another organization",
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the tenant's join-key, invalidating the old one.
    pub async fn regenerate_key(&self, tenant_id: Uuid) -> Result<Tenant, ApiError> {
        let mut tenant = self
            .store
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

        for _ in 0..keygen::MAX_KEY_ATTEMPTS {
            tenant.tenant_key = keygen::tenant_key();
            match self.store.update_tenant(&tenant).await {
                Ok(()) => return Ok(tenant),
                Err(StoreError::Duplicate("tenantKey")) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ApiError::internal_server_error(
            "Could not allocate a unique organization key",
        ))
    }

    /// Change the role of another user within the same tenant.
    pub async fn update_user_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<User, ApiError> {
        let mut user = self
            .store
            .find_user(user_id)
            .await?
            .filter(|u| u.tenant_id == tenant_id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        user.role = role;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        Ok(user)
    }

    /// Issue an invitation. Validity defaults to 7 days, bounded 1–30.
    pub async fn create_invitation(
        &self,
        caller: &AuthUser,
        email: &str,
        role: Role,
        expires_in_days: Option<i64>,
    ) -> Result<Invitation, ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::bad_request("Email is required"));
        }

        let invitations = &config::config().invitations;
        let days = expires_in_days.unwrap_or(invitations.default_expiry_days);
        if !(1..=invitations.max_expiry_days).contains(&days) {
            return Err(ApiError::bad_request(format!(
                "expiresIn must be between 1 and {} days",
                invitations.max_expiry_days
            )));
        }
        let expires_at = Utc::now() + Duration::days(days);

        for _ in 0..keygen::MAX_KEY_ATTEMPTS {
            let invitation = Invitation::new(
                keygen::invitation_code(),
                email.trim().to_string(),
                caller.tenant_id(),
                role,
                caller.id(),
                expires_at,
            );
            match self.store.insert_invitation(&invitation).await {
                Ok(()) => return Ok(invitation),
                Err(StoreError::Duplicate("code")) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ApiError::internal_server_error(
            "Could not allocate a unique invitation code",
        ))
    }

    pub async fn list_invitations(&self, tenant_id: Uuid) -> Result<Vec<Invitation>, ApiError> {
        Ok(self.store.list_invitations_by_tenant(tenant_id).await?)
    }

    /// Revoke an unused invitation; redeemed invitations are immutable.
    pub async fn revoke_invitation(
        &self,
        tenant_id: Uuid,
        invitation_id: Uuid,
    ) -> Result<Invitation, ApiError> {
        match self
            .store
            .delete_unused_invitation(invitation_id, tenant_id)
            .await
        {
            Ok(invitation) => Ok(invitation),
            Err(StoreError::NotFound) => {
                Err(ApiError::not_found("Invitation not found or already used"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Leave the current organization: reassign to the Default tenant and
    /// downgrade to `user`. Refused when the caller is the last admin.
    pub async fn leave(&self, caller: &AuthUser) -> Result<Tenant, ApiError> {
        let admin_count = self.store.count_tenant_admins(caller.tenant_id()).await?;
        if caller.user.is_admin() && admin_count == 1 {
            return Err(ApiError::invalid_state(
                "Cannot leave organization as you are the only admin. \
                 Please assign admin role to another user first.",
            ));
        }

        let fallback = default_tenant(&self.store).await?;

        let mut user = caller.user.clone();
        user.tenant_id = fallback.id;
        user.role = Role::User;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        Ok(fallback)
    }
}
