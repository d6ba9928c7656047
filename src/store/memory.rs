//! In-memory store used for development without `DATABASE_URL` and for
//! tests. A single `RwLock` over all collections keeps multi-document
//! operations (invitation redemption) atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{ChangeRequest, Invitation, Role, Technology, Tenant, User};
use super::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    tenants: HashMap<Uuid, Tenant>,
    invitations: HashMap<Uuid, Invitation>,
    technologies: HashMap<Uuid, Technology>,
    change_requests: HashMap<Uuid, ChangeRequest>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate("email"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_users_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.inner.read().await.users.len() as i64)
    }

    async fn count_tenant_admins(&self, tenant_id: Uuid) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id && u.role == Role::Admin)
            .count() as i64)
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .tenants
            .values()
            .any(|t| t.tenant_key == tenant.tenant_key)
        {
            return Err(StoreError::Duplicate("tenantKey"));
        }
        if let Some(domain) = &tenant.domain {
            if inner
                .tenants
                .values()
                .any(|t| t.domain.as_deref() == Some(domain))
            {
                return Err(StoreError::Duplicate("domain"));
            }
        }
        inner.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn find_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        Ok(self.inner.read().await.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_key(&self, key: &str) -> StoreResult<Option<Tenant>> {
        Ok(self
            .inner
            .read()
            .await
            .tenants
            .values()
            .find(|t| t.tenant_key == key)
            .cloned())
    }

    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>> {
        Ok(self
            .inner
            .read()
            .await
            .tenants
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .tenants
            .values()
            .any(|t| t.id != tenant.id && t.tenant_key == tenant.tenant_key)
        {
            return Err(StoreError::Duplicate("tenantKey"));
        }
        if let Some(domain) = &tenant.domain {
            if inner
                .tenants
                .values()
                .any(|t| t.id != tenant.id && t.domain.as_deref() == Some(domain))
            {
                return Err(StoreError::Duplicate("domain"));
            }
        }
        match inner.tenants.get_mut(&tenant.id) {
            Some(existing) => {
                *existing = tenant.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let inner = self.inner.read().await;
        let mut tenants: Vec<Tenant> = inner.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tenants)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .invitations
            .values()
            .any(|i| i.code == invitation.code)
        {
            return Err(StoreError::Duplicate("code"));
        }
        inner.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_unused_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>> {
        Ok(self
            .inner
            .read()
            .await
            .invitations
            .values()
            .find(|i| i.code == code && !i.used)
            .cloned())
    }

    async fn list_invitations_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let inner = self.inner.read().await;
        let mut invitations: Vec<Invitation> = inner
            .invitations
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn delete_unused_invitation(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Invitation> {
        let mut inner = self.inner.write().await;
        let matches = inner
            .invitations
            .get(&id)
            .map(|i| i.tenant_id == tenant_id && !i.used)
            .unwrap_or(false);
        if !matches {
            return Err(StoreError::NotFound);
        }
        inner.invitations.remove(&id).ok_or(StoreError::NotFound)
    }

    async fn redeem_invitation(&self, invitation: &Invitation, user: &User) -> StoreResult<()> {
        // Both writes under one lock: either half failing leaves the other
        // unapplied.
        let mut inner = self.inner.write().await;
        let still_unused = inner
            .invitations
            .get(&invitation.id)
            .map(|i| !i.used)
            .unwrap_or(false);
        if !still_unused {
            return Err(StoreError::NotFound);
        }
        if !inner.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        inner.invitations.insert(invitation.id, invitation.clone());
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn insert_technology(&self, technology: &Technology) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.technologies.insert(technology.id, technology.clone());
        Ok(())
    }

    async fn find_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Technology>> {
        Ok(self
            .inner
            .read()
            .await
            .technologies
            .get(&id)
            .filter(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_technologies(&self, tenant_id: Option<Uuid>) -> StoreResult<Vec<Technology>> {
        let inner = self.inner.read().await;
        let mut technologies: Vec<Technology> = inner
            .technologies
            .values()
            .filter(|t| tenant_id.map(|id| t.tenant_id == id).unwrap_or(true))
            .cloned()
            .collect();
        technologies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(technologies)
    }

    async fn update_technology(&self, technology: &Technology) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.technologies.get_mut(&technology.id) {
            Some(existing) => {
                *existing = technology.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Technology> {
        let mut inner = self.inner.write().await;
        let matches = inner
            .technologies
            .get(&id)
            .map(|t| t.tenant_id == tenant_id)
            .unwrap_or(false);
        if !matches {
            return Err(StoreError::NotFound);
        }
        inner.technologies.remove(&id).ok_or(StoreError::NotFound)
    }

    async fn insert_change_request(&self, request: &ChangeRequest) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.change_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_change_request(
        &self,
        id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<ChangeRequest>> {
        Ok(self
            .inner
            .read()
            .await
            .change_requests
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_change_requests(
        &self,
        tenant_id: Uuid,
        requested_by: Option<Uuid>,
    ) -> StoreResult<Vec<ChangeRequest>> {
        let inner = self.inner.read().await;
        let mut requests: Vec<ChangeRequest> = inner
            .change_requests
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .filter(|r| requested_by.map(|u| r.requested_by == u).unwrap_or(true))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn update_change_request(&self, request: &ChangeRequest) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.change_requests.get_mut(&request.id) {
            Some(existing) => {
                *existing = request.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::Role;
    use chrono::{Duration, Utc};

    fn user(email: &str, role: Role, tenant_id: Uuid) -> User {
        User::new(email.into(), "Test".into(), role, tenant_id)
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        store
            .insert_user(&user("a@example.com", Role::User, tenant_id))
            .await
            .unwrap();
        let err = store
            .insert_user(&user("A@Example.com", Role::User, tenant_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn duplicate_tenant_key_rejected() {
        let store = MemoryStore::new();
        store
            .insert_tenant(&Tenant::new("A".into(), "samekey".into(), None))
            .await
            .unwrap();
        let err = store
            .insert_tenant(&Tenant::new("B".into(), "samekey".into(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("tenantKey")));
    }

    #[tokio::test]
    async fn update_cannot_claim_another_tenants_domain() {
        let store = MemoryStore::new();
        let a = Tenant::new("A".into(), "key-a".into(), Some("acme.example".into()));
        let mut b = Tenant::new("B".into(), "key-b".into(), None);
        store.insert_tenant(&a).await.unwrap();
        store.insert_tenant(&b).await.unwrap();

        b.domain = Some("acme.example".into());
        let err = store.update_tenant(&b).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("domain")));

        // A tenant keeping its own domain is not a collision
        store.update_tenant(&a).await.unwrap();
    }

    #[tokio::test]
    async fn admin_count_is_tenant_scoped() {
        let store = MemoryStore::new();
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        store.insert_user(&user("a@x.com", Role::Admin, t1)).await.unwrap();
        store.insert_user(&user("b@x.com", Role::Admin, t2)).await.unwrap();
        store.insert_user(&user("c@x.com", Role::User, t1)).await.unwrap();
        assert_eq!(store.count_tenant_admins(t1).await.unwrap(), 1);
        assert_eq!(store.count_tenant_admins(t2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn redeemed_invitation_is_not_redeemable_again() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let admin = user("admin@x.com", Role::Admin, tenant_id);
        let mut joiner = user("bob@x.com", Role::User, Uuid::new_v4());
        store.insert_user(&admin).await.unwrap();
        store.insert_user(&joiner).await.unwrap();

        let mut invitation = Invitation::new(
            "thecode".into(),
            "bob@x.com".into(),
            tenant_id,
            Role::User,
            admin.id,
            Utc::now() + Duration::days(7),
        );
        store.insert_invitation(&invitation).await.unwrap();

        let now = Utc::now();
        invitation.mark_used(joiner.id, now);
        joiner.tenant_id = tenant_id;
        store.redeem_invitation(&invitation, &joiner).await.unwrap();

        // Lookup by code skips used invitations
        assert!(store
            .find_unused_invitation_by_code("thecode")
            .await
            .unwrap()
            .is_none());

        // A second redemption attempt fails outright
        let err = store
            .redeem_invitation(&invitation, &joiner)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn technology_lookup_is_tenant_scoped() {
        let store = MemoryStore::new();
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let draft: crate::store::TechnologyDraft = serde_json::from_value(serde_json::json!({
            "name": "React", "description": "UI library", "vendor": "Meta",
            "capability": "Frontend", "startDate": "2013-05-29"
        }))
        .unwrap();
        let tech = Technology::from_draft(draft, t1, None);
        store.insert_technology(&tech).await.unwrap();

        assert!(store.find_technology(tech.id, t1).await.unwrap().is_some());
        assert!(store.find_technology(tech.id, t2).await.unwrap().is_none());
        assert!(matches!(
            store.delete_technology(tech.id, t2).await.unwrap_err(),
            StoreError::NotFound
        ));
    }
}
