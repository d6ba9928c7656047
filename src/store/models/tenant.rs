use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Name of the tenant users are reassigned to when leaving an organization.
/// Created lazily on first use.
pub const DEFAULT_TENANT_NAME: &str = "Default";

/// An isolated organization. The join-key is the sole secret needed for
/// self-service joining and must be globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub tenant_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default = "default_settings")]
    pub settings: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_settings() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Tenant {
    pub fn new(name: String, tenant_key: String, domain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            tenant_key,
            domain: domain.map(|d| d.to_lowercase()),
            settings: default_settings(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_lowercased() {
        let tenant = Tenant::new("Acme".into(), "abc123".into(), Some("ACME.example".into()));
        assert_eq!(tenant.domain.as_deref(), Some("acme.example"));
    }

    #[test]
    fn serializes_camel_case() {
        let tenant = Tenant::new("Acme".into(), "abc123".into(), None);
        let v = serde_json::to_value(&tenant).unwrap();
        assert_eq!(v["tenantKey"], "abc123");
        assert_eq!(v["isActive"], true);
    }
}
