use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::types::{Identity, SessionClaims};
use crate::shared::AppError;

/// Why a session token was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token is malformed")]
    Malformed,

    #[error("session token signature does not match")]
    BadSignature,

    #[error("session token has expired")]
    Expired,
}

/// Issues and verifies signed session tokens with a single shared secret
#[derive(Clone)]
pub struct SessionSigner {
    secret: String,
    timeout: Duration,
}

impl SessionSigner {
    pub fn new(secret: impl Into<String>, timeout: Duration) -> Self {
        Self {
            secret: secret.into(),
            timeout,
        }
    }

    /// Creates a token for the given user that expires after the configured timeout
    #[instrument(skip(self, login))]
    pub fn issue_session(&self, user_id: i64, login: &str) -> Result<String, AppError> {
        let expires_at = Utc::now().checked_add_signed(self.timeout).ok_or_else(|| {
            warn!("Session timeout pushes expiry out of range");
            AppError::JwtError("Session expiry out of range".to_string())
        })?;
        self.issue_session_until(user_id, login, expires_at)
    }

    /// Creates a token with an explicit expiry.
    ///
    /// There is no per-token nonce, so equal inputs produce equal tokens.
    pub fn issue_session_until(
        &self,
        user_id: i64,
        login: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = SessionClaims {
            user_id,
            user_login: login.to_string(),
            exp: expires_at.timestamp(),
        };

        debug!(user_id, exp_timestamp = claims.exp, "Signing session token");

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode session token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Checks signature and expiry and returns the identity the token proves
    #[instrument(skip(self, token))]
    pub fn verify_session(&self, token: &str) -> Result<Identity, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode session token");
            match e.kind() {
                ErrorKind::InvalidSignature => SessionError::BadSignature,
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Malformed,
            }
        })?;

        // The decoder's own expiry check is not relied upon.
        if claims.exp <= Utc::now().timestamp() {
            debug!(exp = claims.exp, "Session token is past its expiry");
            return Err(SessionError::Expired);
        }

        debug!(
            user_id = claims.user_id,
            login = %claims.user_login,
            "Session token verified"
        );

        Ok(claims.into())
    }
}
