use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tower::ServiceExt; // for `oneshot`

use photoshare::{
    db,
    password::PasswordPolicy,
    photo::{repository::SqlitePhotoRepository, PhotoStorage},
    session::{SessionSigner, SESSION_COOKIE},
    user::{repository::SqliteUserRepository, UserService},
    AppState,
};

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
const BOUNDARY: &str = "photoshare-integration-boundary";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// A full router over an in-memory SQLite database and a scratch photo directory
pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    photo_root: PathBuf,
}

pub struct TestSetupBuilder {
    policy: PasswordPolicy,
    max_upload_bytes: usize,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            policy: PasswordPolicy::Easy,
            max_upload_bytes: 1024 * 1024,
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub async fn build(self) -> TestSetup {
        let pool = db::connect_in_memory().await.unwrap();
        let photo_root =
            std::env::temp_dir().join(format!("photoshare-it-{}", uuid::Uuid::new_v4()));

        let state = AppState::new(
            Arc::new(SqliteUserRepository::new(pool.clone())),
            Arc::new(SqlitePhotoRepository::new(pool)),
            PhotoStorage::new(photo_root.clone()),
            SessionSigner::new("integration-secret", chrono::Duration::minutes(15)),
            self.policy,
        );

        UserService::new(state.user_repository.clone(), state.password_policy.clone())
            .seed_admin(ADMIN_LOGIN, ADMIN_PASSWORD)
            .await
            .unwrap();

        TestSetup {
            app: photoshare::router(state.clone(), self.max_upload_bytes),
            state,
            photo_root,
        }
    }
}

impl Drop for TestSetup {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.photo_root);
    }
}

/// Status, headers and parsed body of one call
pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Session token from the `Set-Cookie` header
    pub fn session_token(&self) -> Option<String> {
        let cookie = self.set_cookie.as_deref()?;
        let (pair, _) = cookie.split_once(';').unwrap_or((cookie, ""));
        let (name, value) = pair.split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl TestSetup {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = header_string(response.headers(), header::SET_COOKIE);
        let content_type = header_string(response.headers(), header::CONTENT_TYPE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            set_cookie,
            content_type,
            body,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        json: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    // ========================================================================
    // Actions
    // ========================================================================

    pub async fn register(&self, login: &str, password: &str) -> TestResponse {
        self.call(
            "POST",
            "/api/register",
            None,
            Some(serde_json::json!({ "login": login, "password": password })),
        )
        .await
    }

    pub async fn login(&self, login: &str, password: &str) -> TestResponse {
        self.call(
            "POST",
            "/api/login",
            None,
            Some(serde_json::json!({ "login": login, "password": password })),
        )
        .await
    }

    /// Registers and logs in, returning the session token
    pub async fn signed_up(&self, login: &str, password: &str) -> String {
        assert_eq!(self.register(login, password).await.status, StatusCode::CREATED);
        let response = self.login(login, password).await;
        assert_eq!(response.status, StatusCode::OK);
        response.session_token().unwrap()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_LOGIN, ADMIN_PASSWORD)
            .await
            .session_token()
            .unwrap()
    }

    pub async fn upload(
        &self,
        token: &str,
        file_name: &str,
        bytes: &[u8],
        public: bool,
    ) -> TestResponse {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"public\"\r\n\r\n{}\r\n--{BOUNDARY}--\r\n",
                if public { "1" } else { "0" }
            )
            .as_bytes(),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/api/add-photo")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn gallery(&self) -> Vec<(String, String)> {
        let response = self.call("GET", "/api/public-gallery", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        response
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                (
                    e["user"].as_str().unwrap().to_string(),
                    e["filename"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}
