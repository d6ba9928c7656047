pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keygen;
pub mod middleware;
pub mod policy;
pub mod services;
pub mod state;
pub mod store;
