use serde::{Deserialize, Serialize};

/// JWT claims structure carried inside the session cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub user_id: i64,
    pub user_login: String,
    pub exp: i64, // Expiration timestamp (standard JWT claim)
}

/// The authenticated principal a valid session token proves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub login: String,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            login: claims.user_login,
        }
    }
}

/// Request-scoped identity plus role and ban state read from the user store.
///
/// Built fresh by the administrative gate on every request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    pub identity: Identity,
    pub is_admin: bool,
    pub is_banned: bool,
}

/// Credentials payload for the login endpoint
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Response structure for a successful login
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status: String,
    pub is_admin: bool,
}
