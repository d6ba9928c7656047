//! Registration, credential login, and OAuth upsert.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::auth;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::error::ApiError;
use crate::services::membership_service::{create_organization, default_tenant};
use crate::store::models::{Role, Tenant, User};
use crate::store::{Store, StoreError};

pub struct AccountService {
    store: Arc<dyn Store>,
}

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub tenant_key: Option<String>,
    pub organization_name: Option<String>,
}

pub struct AuthOutcome {
    pub user: User,
    pub tenant: Tenant,
    pub token: String,
    pub is_first_user: bool,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a local account. Tenant placement, in priority order: explicit
    /// join-key, a freshly created organization, or the shared Default tenant.
    /// The very first account on the instance is always made an admin.
    pub async fn register(&self, input: RegisterInput) -> Result<AuthOutcome, ApiError> {
        let email = input.email.trim().to_lowercase();
        let name = input.name.trim().to_string();
        if email.is_empty() || name.is_empty() {
            return Err(ApiError::bad_request("Email and name are required"));
        }
        if !email.contains('@') {
            return Err(ApiError::bad_request("A valid email address is required"));
        }
        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let is_first_user = self.store.count_users().await? == 0;

        let (tenant, mut role) = self.place_new_account(&input, &name, is_first_user).await?;
        if is_first_user {
            role = Role::Admin;
        }

        let mut user = User::new(email, name, role, tenant.id);
        user.password_hash = Some(hash_password(&input.password)?);
        user.last_login = Some(Utc::now());

        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate("email")) => {
                return Err(ApiError::conflict("An account with this email already exists"))
            }
            Err(e) => return Err(e.into()),
        }

        if is_first_user {
            info!(email = %user.email, "first account registered, granted admin role");
        }

        let token = auth::generate_token(&user)?;
        Ok(AuthOutcome {
            user,
            tenant,
            token,
            is_first_user,
        })
    }

    async fn place_new_account(
        &self,
        input: &RegisterInput,
        name: &str,
        is_first_user: bool,
    ) -> Result<(Tenant, Role), ApiError> {
        if let Some(key) = input.tenant_key.as_deref().filter(|k| !k.is_empty()) {
            let tenant = self
                .store
                .find_tenant_by_key(key)
                .await?
                .ok_or_else(|| ApiError::not_found("Invalid tenant key"))?;
            return Ok((tenant, Role::User));
        }

        if let Some(org) = input
            .organization_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
        {
            let tenant = create_organization(&self.store, org, None).await?;
            return Ok((tenant, Role::Admin));
        }

        // The very first account gets its own organization rather than the
        // shared Default tenant
        if is_first_user {
            let tenant =
                create_organization(&self.store, &format!("{name}'s Organization"), None).await?;
            return Ok((tenant, Role::Admin));
        }

        let tenant = default_tenant(&self.store).await?;
        Ok((tenant, Role::User))
    }

    /// Verify credentials and mint a session token. The failure message never
    /// distinguishes an unknown email from a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ApiError> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;
        if !verify_password(password, hash)? {
            return Err(ApiError::unauthorized("Invalid email or password"));
        }

        user.last_login = Some(Utc::now());
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        let tenant = self
            .store
            .find_tenant(user.tenant_id)
            .await?
            .ok_or_else(|| ApiError::internal_server_error("Tenant record missing"))?;

        let token = auth::generate_token(&user)?;
        Ok(AuthOutcome {
            user,
            tenant,
            token,
            is_first_user: false,
        })
    }

    /// Upsert an account from a verified OAuth identity. Existing accounts
    /// are linked by email; new ones are placed like a plain registration
    /// without a join-key.
    pub async fn oauth_login(
        &self,
        google_id: &str,
        email: &str,
        name: &str,
        picture: Option<String>,
    ) -> Result<AuthOutcome, ApiError> {
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        if let Some(mut user) = self.store.find_user_by_email(&email).await? {
            user.google_id = Some(google_id.to_string());
            if picture.is_some() {
                user.picture = picture;
            }
            user.last_login = Some(now);
            user.updated_at = now;
            self.store.update_user(&user).await?;

            let tenant = self
                .store
                .find_tenant(user.tenant_id)
                .await?
                .ok_or_else(|| ApiError::internal_server_error("Tenant record missing"))?;
            let token = auth::generate_token(&user)?;
            return Ok(AuthOutcome {
                user,
                tenant,
                token,
                is_first_user: false,
            });
        }

        let is_first_user = self.store.count_users().await? == 0;
        let tenant = if is_first_user {
            create_organization(&self.store, &format!("{}'s Organization", name.trim()), None)
                .await?
        } else {
            default_tenant(&self.store).await?
        };

        let role = if is_first_user { Role::Admin } else { Role::User };
        let mut user = User::new(email, name.trim().to_string(), role, tenant.id);
        user.google_id = Some(google_id.to_string());
        user.picture = picture;
        user.last_login = Some(now);
        self.store.insert_user(&user).await?;

        let token = auth::generate_token(&user)?;
        Ok(AuthOutcome {
            user,
            tenant,
            token,
            is_first_user,
        })
    }
}
