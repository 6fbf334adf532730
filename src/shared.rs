use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::password::{PasswordError, PasswordPolicy};
use crate::photo::repository::PhotoRepository;
use crate::photo::storage::PhotoStorage;
use crate::session::{SessionError, SessionSigner};
use crate::user::repository::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub photo_repository: Arc<dyn PhotoRepository + Send + Sync>,
    pub photo_storage: PhotoStorage,
    pub session_signer: SessionSigner,
    pub password_policy: Arc<PasswordPolicy>,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        photo_repository: Arc<dyn PhotoRepository + Send + Sync>,
        photo_storage: PhotoStorage,
        session_signer: SessionSigner,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            user_repository,
            photo_repository,
            photo_storage,
            session_signer,
            password_policy: Arc::new(password_policy),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Password rejected: {}", .0.join(", "))]
    PolicyViolation(Vec<String>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Internal server error")]
    Internal,
}

/// Every session failure looks the same to the client.
impl From<SessionError> for AppError {
    fn from(_: SessionError) -> Self {
        AppError::Unauthorized("Unauthorized".to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Rejected(reasons) => AppError::PolicyViolation(reasons),
            // A broken pattern is an operator mistake, not the user's.
            PasswordError::InvalidPattern(_) => AppError::Internal,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

/// Unwraps a JSON body, turning any rejection into a plain bad request
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(format!("Invalid JSON: {}", rejection.body_text())))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::PolicyViolation(reasons) = self {
            let body = Json(json!({
                "error": format!("password must contain: {}", reasons.join(", ")),
                "reasons": reasons,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::StorageError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Photo exceeds the upload limit".to_string(),
            ),
            AppError::PolicyViolation(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::photo::repository::InMemoryPhotoRepository;
    use crate::user::repository::InMemoryUserRepository;
    use chrono::Duration;
    use std::path::PathBuf;

    pub const TEST_SECRET: &str = "test_secret_key_for_jwt";

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        user_repository: Option<Arc<dyn UserRepository + Send + Sync>>,
        photo_root: Option<PathBuf>,
        password_policy: PasswordPolicy,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_repository: None,
                photo_root: None,
                password_policy: PasswordPolicy::NoValidation,
            }
        }

        pub fn with_user_repository(
            mut self,
            repo: Arc<dyn UserRepository + Send + Sync>,
        ) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_photo_root(mut self, root: PathBuf) -> Self {
            self.photo_root = Some(root);
            self
        }

        pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
            self.password_policy = policy;
            self
        }

        pub fn build(self) -> AppState {
            let users: Arc<dyn UserRepository + Send + Sync> = match self.user_repository {
                Some(repo) => repo,
                None => Arc::new(InMemoryUserRepository::new()),
            };
            let photos = Arc::new(InMemoryPhotoRepository::new(users.clone()));
            let root = self
                .photo_root
                .unwrap_or_else(|| std::env::temp_dir().join("photoshare-unit-tests"));

            AppState::new(
                users,
                photos,
                PhotoStorage::new(root),
                SessionSigner::new(TEST_SECRET, Duration::minutes(15)),
                self.password_policy,
            )
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
