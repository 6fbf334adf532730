// Public API - what other modules can use
pub use handlers::{add_photo, delete_photo, get_photo, list_photos, public_gallery, toggle_public};
pub use service::PhotoService;
pub use storage::PhotoStorage;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;
pub mod types;
