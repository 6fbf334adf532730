use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    credentials::{hash_password, verify_password},
    models::{NewUser, UserModel},
    repository::UserRepository,
    types::UserResponse,
};
use crate::access;
use crate::password::PasswordPolicy;
use crate::photo::storage::is_safe_path_component;
use crate::session::SecurityContext;
use crate::shared::AppError;

const BAD_CREDENTIALS: &str = "Invalid login or password";

/// Service for account business logic
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    policy: Arc<PasswordPolicy>,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        policy: Arc<PasswordPolicy>,
    ) -> Self {
        Self { repository, policy }
    }

    /// Creates a regular account after checking the password policy
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<i64, AppError> {
        // Logins double as directory names in photo storage
        if !is_safe_path_component(login) {
            warn!("Rejected registration with unusable login");
            return Err(AppError::BadRequest("Invalid login".to_string()));
        }

        if let Err(e) = self.policy.validate(password) {
            warn!(policy = %self.policy.mode(), error = %e, "Password rejected by policy");
            return Err(e.into());
        }

        let hash = hash_password(password)?;
        let id = self.repository.insert(&NewUser::regular(login, &hash)).await?;

        info!(user_id = id, "User registered");
        Ok(id)
    }

    /// Checks a login/password pair. Unknown logins and wrong passwords fail identically.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<UserModel, AppError> {
        let Some(user) = self.repository.find_by_login(login).await? else {
            warn!("Login attempt for unknown user");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        info!(user_id = user.id, "User authenticated");
        Ok(user)
    }

    /// Seeds the default admin when the store is empty. Returns whether it did.
    ///
    /// The seed password comes from configuration and skips the policy check.
    #[instrument(skip(self, password))]
    pub async fn seed_admin(&self, login: &str, password: &str) -> Result<bool, AppError> {
        if self.repository.count_users().await? > 0 {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        let id = self.repository.insert(&NewUser::admin(login, &hash)).await?;

        info!(user_id = id, "Seeded default admin account");
        Ok(true)
    }

    /// Non-admin accounts with their ban state, for administrators only
    #[instrument(skip(self, ctx), fields(requester = %ctx.identity.login))]
    pub async fn list_users(&self, ctx: &SecurityContext) -> Result<Vec<UserResponse>, AppError> {
        if !ctx.is_admin {
            warn!("Non-admin tried to list users");
            return Err(AppError::Forbidden("not-admin".to_string()));
        }

        let users = self
            .repository
            .list_users()
            .await?
            .into_iter()
            .filter(|u| !u.is_admin)
            .map(|u| UserResponse {
                login: u.login,
                is_banned: u.is_banned,
            })
            .collect();

        Ok(users)
    }

    #[instrument(skip(self, ctx), fields(requester = %ctx.identity.login))]
    pub async fn set_ban_status(
        &self,
        ctx: &SecurityContext,
        target_login: &str,
        banned: bool,
    ) -> Result<(), AppError> {
        access::can_ban(&ctx.identity.login, target_login, ctx.is_admin)
            .into_result()
            .inspect_err(|e| warn!(error = %e, "Ban request denied"))?;

        self.repository.update_ban_status(target_login, banned).await?;

        info!(banned, "Ban status updated");
        Ok(())
    }
}
