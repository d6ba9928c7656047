pub mod auth;
pub mod csrf;

pub use auth::{optional_auth, require_auth, AuthUser};
pub use csrf::csrf_protection;
