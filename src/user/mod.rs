// Public API - what other modules can use
pub use handlers::{list_users, manage_ban, register};
pub use service::UserService;

// Internal modules
pub mod credentials;
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
