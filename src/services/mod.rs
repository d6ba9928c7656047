pub mod account_service;
pub mod catalog_service;
pub mod change_request_service;
pub mod membership_service;

pub use account_service::AccountService;
pub use catalog_service::CatalogService;
pub use change_request_service::ChangeRequestService;
pub use membership_service::MembershipService;
