use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserModel {
    pub id: i64,
    pub login: String, // Unique
    pub password_hash: String,
    pub is_admin: bool,
    pub is_banned: bool,
}

/// Row to be inserted; the store assigns the id and new users start unbanned
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl NewUser {
    pub fn regular(login: &str, password_hash: &str) -> Self {
        Self {
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            is_admin: false,
        }
    }

    pub fn admin(login: &str, password_hash: &str) -> Self {
        Self {
            is_admin: true,
            ..Self::regular(login, password_hash)
        }
    }
}
