//! Authorization policy: a single pure decision function.
//!
//! Every handler calls [`authorize`] once instead of re-deriving role checks
//! inline; there are no other role comparisons in the codebase.

use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Authorization predicate evaluated against a resolved caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Any authenticated caller
    Authenticated,
    /// Admin role within the resource's tenant
    TenantAdmin,
    /// Tenant enumeration: admin role plus the configured system-admin email
    SystemAdmin,
}

/// Pure decision: may `caller` perform an action requiring `capability`
/// against `resource_tenant`?
pub fn can_perform(caller: &AuthUser, capability: Capability, resource_tenant: Uuid) -> bool {
    match capability {
        Capability::Authenticated => true,
        Capability::TenantAdmin => {
            caller.user.is_admin() && caller.user.tenant_id == resource_tenant
        }
        Capability::SystemAdmin => {
            let configured = config::config().security.system_admin_email.as_deref();
            caller.user.is_admin()
                && configured.is_some_and(|email| email.eq_ignore_ascii_case(&caller.user.email))
        }
    }
}

/// Check a capability against the caller's own tenant.
pub fn authorize(caller: &AuthUser, capability: Capability) -> Result<(), ApiError> {
    authorize_for(caller, capability, caller.user.tenant_id)
}

/// Check a capability against an explicit resource tenant. Rejections never
/// name the resource tenant.
pub fn authorize_for(
    caller: &AuthUser,
    capability: Capability,
    resource_tenant: Uuid,
) -> Result<(), ApiError> {
    if can_perform(caller, capability, resource_tenant) {
        return Ok(());
    }
    Err(match capability {
        Capability::SystemAdmin => ApiError::forbidden("System admin access required"),
        _ => ApiError::forbidden("Admin access required"),
    })
}
