use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// Single-use, expiring, email-targeted join code scoped to a tenant and a
/// role. Once `used` is set the code can never be redeemed again, regardless
/// of expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub code: String,
    pub email: String,
    pub tenant_id: Uuid,
    pub role: Role,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn new(
        code: String,
        email: String,
        tenant_id: Uuid,
        role: Role,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            email: email.to_lowercase(),
            tenant_id,
            role,
            created_by,
            created_at: Utc::now(),
            expires_at,
            used: false,
            used_by: None,
            used_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Terminal transition: once marked used an invitation is immutable.
    pub fn mark_used(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        self.used = true;
        self.used_by = Some(user_id);
        self.used_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let inv = Invitation::new(
            "code".into(),
            "bob@example.com".into(),
            Uuid::new_v4(),
            Role::User,
            Uuid::new_v4(),
            now - Duration::hours(1),
        );
        assert!(inv.is_expired(now));
        assert!(!inv.is_expired(now - Duration::hours(2)));
    }

    #[test]
    fn email_is_lowercased() {
        let inv = Invitation::new(
            "code".into(),
            "Bob@Example.COM".into(),
            Uuid::new_v4(),
            Role::User,
            Uuid::new_v4(),
            Utc::now(),
        );
        assert_eq!(inv.email, "bob@example.com");
    }
}
