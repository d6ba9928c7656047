use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Overall lifecycle status of a technology or one of its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    Active,
    Deprecated,
    Retired,
    Planned,
    Proposed,
}

impl Default for LifecycleStatus {
    fn default() -> Self {
        LifecycleStatus::Active
    }
}

/// Versioned sub-record embedded in a technology. `version_number` is unique
/// within the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version_number: String,
    pub release_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_support_date: Option<NaiveDate>,
    #[serde(default)]
    pub lifecycle_status: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A catalog entry. Every record belongs to exactly one tenant and all
/// reads/writes are filtered by that tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technology {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub vendor: String,
    pub capability: String,
    #[serde(default)]
    pub lifecycle_status: LifecycleStatus,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub tenant_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Descriptive extras carried over from imported standards catalogs
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_considerations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_considerations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
}

/// Client-supplied content of a technology: everything except identity,
/// tenancy and audit fields. Also the payload shape of a `create`
/// change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyDraft {
    pub name: String,
    pub description: String,
    pub vendor: String,
    pub capability: String,
    #[serde(default)]
    pub lifecycle_status: LifecycleStatus,
    #[serde(default)]
    pub versions: Vec<Version>,
    pub current_version: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub business_impact: Option<String>,
    pub use_case: Option<String>,
    pub limitations: Option<String>,
    pub alternatives: Option<String>,
    pub documentation_url: Option<String>,
    pub security_considerations: Option<String>,
    pub cost_considerations: Option<String>,
    pub compliance_requirements: Option<String>,
    pub license_type: Option<String>,
}

impl Technology {
    pub fn from_draft(draft: TechnologyDraft, tenant_id: Uuid, actor: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            vendor: draft.vendor,
            capability: draft.capability,
            lifecycle_status: draft.lifecycle_status,
            versions: draft.versions,
            current_version: draft.current_version,
            start_date: draft.start_date,
            end_date: draft.end_date,
            tenant_id,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
            kind: draft.kind,
            business_impact: draft.business_impact,
            use_case: draft.use_case,
            limitations: draft.limitations,
            alternatives: draft.alternatives,
            documentation_url: draft.documentation_url,
            security_considerations: draft.security_considerations,
            cost_considerations: draft.cost_considerations,
            compliance_requirements: draft.compliance_requirements,
            license_type: draft.license_type,
        }
    }

    /// Check record-level invariants: required text fields are non-empty,
    /// version numbers are unique within the record, and `current_version`,
    /// when set, names an existing version.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("vendor", &self.vendor),
            ("capability", &self.capability),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Field '{}' is required", field));
            }
        }

        let mut seen = HashSet::new();
        for version in &self.versions {
            if version.version_number.trim().is_empty() {
                return Err("Version number is required".to_string());
            }
            if !seen.insert(version.version_number.as_str()) {
                return Err(format!(
                    "Duplicate version number '{}'",
                    version.version_number
                ));
            }
        }

        if let Some(current) = &self.current_version {
            if !self.versions.iter().any(|v| &v.version_number == current) {
                return Err(format!(
                    "currentVersion '{}' does not match any version",
                    current
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TechnologyDraft {
        serde_json::from_value(serde_json::json!({
            "name": "PostgreSQL",
            "description": "Relational database",
            "vendor": "PostgreSQL Global Development Group",
            "capability": "Database",
            "lifecycleStatus": "Active",
            "startDate": "1996-09-01",
            "versions": [
                { "versionNumber": "15", "releaseDate": "2022-10-13" },
                { "versionNumber": "16", "releaseDate": "2023-09-14" }
            ],
            "currentVersion": "16"
        }))
        .unwrap()
    }

    #[test]
    fn valid_draft_passes() {
        let tech = Technology::from_draft(draft(), Uuid::new_v4(), None);
        assert!(tech.validate().is_ok());
        assert_eq!(tech.lifecycle_status, LifecycleStatus::Active);
    }

    #[test]
    fn current_version_must_exist() {
        let mut tech = Technology::from_draft(draft(), Uuid::new_v4(), None);
        tech.current_version = Some("17".into());
        assert!(tech.validate().is_err());
    }

    #[test]
    fn version_numbers_must_be_unique() {
        let mut tech = Technology::from_draft(draft(), Uuid::new_v4(), None);
        tech.versions[1].version_number = "15".into();
        tech.current_version = None;
        assert!(tech.validate().is_err());
    }

    #[test]
    fn empty_name_rejected() {
        let mut tech = Technology::from_draft(draft(), Uuid::new_v4(), None);
        tech.name = "  ".into();
        assert!(tech.validate().is_err());
    }

    #[test]
    fn status_serializes_as_pascal_case() {
        assert_eq!(
            serde_json::to_value(LifecycleStatus::Deprecated).unwrap(),
            "Deprecated"
        );
    }
}
