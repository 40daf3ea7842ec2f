pub mod auth;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod security;
pub mod series;
pub mod service;
pub mod settings;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::security_headers;
