//! Postgres-backed document store. Each collection is a two-column table
//! (`id UUID`, `doc JSONB`); uniqueness of emails, join-keys, invitation
//! codes and domains is enforced with expression indexes so that random
//! key collisions surface as `StoreError::Duplicate`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;
use uuid::Uuid;

use super::models::{ChangeRequest, Invitation, Technology, Tenant, User};
use super::{Store, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users ((lower(doc->>'email')))",
    "CREATE TABLE IF NOT EXISTS tenants (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE UNIQUE INDEX IF NOT EXISTS tenants_key_key ON tenants ((doc->>'tenantKey'))",
    "CREATE UNIQUE INDEX IF NOT EXISTS tenants_domain_key ON tenants ((doc->>'domain')) \
     WHERE doc->>'domain' IS NOT NULL",
    "CREATE TABLE IF NOT EXISTS invitations (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE UNIQUE INDEX IF NOT EXISTS invitations_code_key ON invitations ((doc->>'code'))",
    "CREATE TABLE IF NOT EXISTS technologies (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS technologies_tenant_idx ON technologies ((doc->>'tenantId'))",
    "CREATE TABLE IF NOT EXISTS change_requests (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS change_requests_tenant_idx ON change_requests ((doc->>'tenantId'))",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and unique indexes if they don't exist yet.
    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Document store schema ready");
        Ok(())
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_doc<T: DeserializeOwned>(
        &self,
        sql: &str,
        bind: &str,
    ) -> StoreResult<Option<T>> {
        let doc: Option<Value> = sqlx::query_scalar(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        doc.map(parse).transpose()
    }

    async fn fetch_docs<T: DeserializeOwned>(
        &self,
        sql: &str,
        bind: Option<&str>,
    ) -> StoreResult<Vec<T>> {
        let query = sqlx::query_scalar(sql);
        let query = match bind {
            Some(value) => query.bind(value.to_string()),
            None => query,
        };
        let docs: Vec<Value> = query.fetch_all(&self.pool).await?;
        docs.into_iter().map(parse).collect()
    }

    async fn insert_doc<T: Serialize>(
        &self,
        table: &str,
        id: Uuid,
        value: &T,
        unique_field: &'static str,
    ) -> StoreResult<()> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", table);
        sqlx::query(&sql)
            .bind(id)
            .bind(to_doc(value)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, unique_field))?;
        Ok(())
    }

    async fn replace_doc<T: Serialize>(
        &self,
        table: &str,
        id: Uuid,
        value: &T,
        unique_field: &'static str,
    ) -> StoreResult<()> {
        let sql = format!("UPDATE {} SET doc = $2 WHERE id = $1", table);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(to_doc(value)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, unique_field))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(doc: Value) -> StoreResult<T> {
    Ok(serde_json::from_value(doc)?)
}

fn to_doc<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn map_unique(err: sqlx::Error, field: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(field),
        _ => StoreError::Sqlx(err),
    }
}

/// Tenants carry two unique indexes; tell them apart by constraint name.
fn map_tenant_unique(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("tenants_domain_key") => StoreError::Duplicate("domain"),
                _ => StoreError::Duplicate("tenantKey"),
            };
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.insert_doc("users", user.id, user, "email").await
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let doc: Option<Value> = sqlx::query_scalar("SELECT doc FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        doc.map(parse).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.fetch_doc(
            "SELECT doc FROM users WHERE lower(doc->>'email') = lower($1)",
            email,
        )
        .await
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.replace_doc("users", user.id, user, "email").await
    }

    async fn list_users_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<User>> {
        self.fetch_docs(
            "SELECT doc FROM users WHERE doc->>'tenantId' = $1 ORDER BY doc->>'createdAt'",
            Some(&tenant_id.to_string()),
        )
        .await
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_tenant_admins(&self, tenant_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE doc->>'tenantId' = $1 AND doc->>'role' = 'admin'",
        )
        .bind(tenant_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        sqlx::query("INSERT INTO tenants (id, doc) VALUES ($1, $2)")
            .bind(tenant.id)
            .bind(to_doc(tenant)?)
            .execute(&self.pool)
            .await
            .map_err(map_tenant_unique)?;
        Ok(())
    }

    async fn find_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        let doc: Option<Value> = sqlx::query_scalar("SELECT doc FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        doc.map(parse).transpose()
    }

    async fn find_tenant_by_key(&self, key: &str) -> StoreResult<Option<Tenant>> {
        self.fetch_doc("SELECT doc FROM tenants WHERE doc->>'tenantKey' = $1", key)
            .await
    }

    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>> {
        self.fetch_doc("SELECT doc FROM tenants WHERE doc->>'name' = $1", name)
            .await
    }

    async fn update_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let result = sqlx::query("UPDATE tenants SET doc = $2 WHERE id = $1")
            .bind(tenant.id)
            .bind(to_doc(tenant)?)
            .execute(&self.pool)
            .await
            .map_err(map_tenant_unique)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        self.fetch_docs(
            "SELECT doc FROM tenants ORDER BY doc->>'createdAt' DESC",
            None,
        )
        .await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        self.insert_doc("invitations", invitation.id, invitation, "code")
            .await
    }

    async fn find_unused_invitation_by_code(&self, code: &str) -> StoreResult<Option<Invitation>> {
        self.fetch_doc(
            "SELECT doc FROM invitations WHERE doc->>'code' = $1 AND (doc->>'used')::boolean = false",
            code,
        )
        .await
    }

    async fn list_invitations_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<Invitation>> {
        self.fetch_docs(
            "SELECT doc FROM invitations WHERE doc->>'tenantId' = $1 \
             ORDER BY doc->>'createdAt' DESC",
            Some(&tenant_id.to_string()),
        )
        .await
    }

    async fn delete_unused_invitation(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Invitation> {
        let doc: Option<Value> = sqlx::query_scalar(
            "DELETE FROM invitations WHERE id = $1 AND doc->>'tenantId' = $2 \
             AND (doc->>'used')::boolean = false RETURNING doc",
        )
        .bind(id)
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        doc.map(parse).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn redeem_invitation(&self, invitation: &Invitation, user: &User) -> StoreResult<()> {
        // Both halves in one transaction: mark the invitation used and
        // reassign the redeeming user.
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE invitations SET doc = $2 WHERE id = $1 AND (doc->>'used')::boolean = false",
        )
        .bind(invitation.id)
        .bind(to_doc(invitation)?)
        .execute(&mut *tx)
        .await?;
        if marked.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let reassigned = sqlx::query("UPDATE users SET doc = $2 WHERE id = $1")
            .bind(user.id)
            .bind(to_doc(user)?)
            .execute(&mut *tx)
            .await?;
        if reassigned.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_technology(&self, technology: &Technology) -> StoreResult<()> {
        self.insert_doc("technologies", technology.id, technology, "id")
            .await
    }

    async fn find_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Technology>> {
        let doc: Option<Value> = sqlx::query_scalar(
            "SELECT doc FROM technologies WHERE id = $1 AND doc->>'tenantId' = $2",
        )
        .bind(id)
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        doc.map(parse).transpose()
    }

    async fn list_technologies(&self, tenant_id: Option<Uuid>) -> StoreResult<Vec<Technology>> {
        match tenant_id {
            Some(id) => {
                self.fetch_docs(
                    "SELECT doc FROM technologies WHERE doc->>'tenantId' = $1 \
                     ORDER BY doc->>'createdAt'",
                    Some(&id.to_string()),
                )
                .await
            }
            None => {
                self.fetch_docs(
                    "SELECT doc FROM technologies ORDER BY doc->>'createdAt'",
                    None,
                )
                .await
            }
        }
    }

    async fn update_technology(&self, technology: &Technology) -> StoreResult<()> {
        self.replace_doc("technologies", technology.id, technology, "id")
            .await
    }

    async fn delete_technology(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Technology> {
        let doc: Option<Value> = sqlx::query_scalar(
            "DELETE FROM technologies WHERE id = $1 AND doc->>'tenantId' = $2 RETURNING doc",
        )
        .bind(id)
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        doc.map(parse).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn insert_change_request(&self, request: &ChangeRequest) -> StoreResult<()> {
        self.insert_doc("change_requests", request.id, request, "id")
            .await
    }

    async fn find_change_request(
        &self,
        id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<ChangeRequest>> {
        let doc: Option<Value> = sqlx::query_scalar(
            "SELECT doc FROM change_requests WHERE id = $1 AND doc->>'tenantId' = $2",
        )
        .bind(id)
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        doc.map(parse).transpose()
    }

    async fn list_change_requests(
        &self,
        tenant_id: Uuid,
        requested_by: Option<Uuid>,
    ) -> StoreResult<Vec<ChangeRequest>> {
        match requested_by {
            Some(user_id) => {
                let docs: Vec<Value> = sqlx::query_scalar(
                    "SELECT doc FROM change_requests WHERE doc->>'tenantId' = $1 \
                     AND doc->>'requestedBy' = $2 ORDER BY doc->>'createdAt' DESC",
                )
                .bind(tenant_id.to_string())
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;
                docs.into_iter().map(parse).collect()
            }
            None => {
                self.fetch_docs(
                    "SELECT doc FROM change_requests WHERE doc->>'tenantId' = $1 \
                     ORDER BY doc->>'createdAt' DESC",
                    Some(&tenant_id.to_string()),
                )
                .await
            }
        }
    }

    async fn update_change_request(&self, request: &ChangeRequest) -> StoreResult<()> {
        self.replace_doc("change_requests", request.id, request, "id")
            .await
    }
}
