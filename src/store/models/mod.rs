pub mod change_request;
pub mod invitation;
pub mod technology;
pub mod tenant;
pub mod user;

pub use change_request::{ChangeRequest, ChangeRequestStatus, RequestType};
pub use invitation::Invitation;
pub use technology::{LifecycleStatus, Technology, TechnologyDraft, Version};
pub use tenant::{Tenant, DEFAULT_TENANT_NAME};
pub use user::{Role, User};
