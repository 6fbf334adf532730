// Library crate for the photo sharing server
// This file exposes the public API for integration tests

pub mod access;
pub mod config;
pub mod db;
pub mod password;
pub mod photo;
pub mod session;
pub mod shared;
pub mod user;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use config::Config;
pub use shared::{AppError, AppState};

/// Builds the full HTTP API.
///
/// Routes behind the basic gate need a valid session cookie; routes behind
/// the administrative gate additionally resolve the caller in the user store.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let basic = Router::new()
        .route(
            "/api/add-photo",
            post(photo::add_photo).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/toggle-public", post(photo::toggle_public))
        .route(
            "/api/delete-photo/:login/:filename",
            delete(photo::delete_photo),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    let administrative = Router::new()
        .route("/api/users", get(user::list_users))
        .route("/api/manage-ban", post(user::manage_ban))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_security_context,
        ));

    Router::new()
        .route("/api/login", post(session::login))
        .route("/api/register", post(user::register))
        .route("/api/public-gallery", get(photo::public_gallery))
        .route("/api/photos/:login", get(photo::list_photos))
        .route("/api/photos/:login/:filename", get(photo::get_photo))
        .merge(basic)
        .merge(administrative)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
