pub mod auth;
pub mod change_requests;
pub mod oauth;
pub mod technologies;
pub mod tenants;
