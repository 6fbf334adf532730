use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{NewUser, UserModel};
use crate::shared::AppError;

/// Trait for user store operations
#[async_trait]
pub trait UserRepository {
    async fn find_by_login(&self, login: &str) -> Result<Option<UserModel>, AppError>;

    /// Inserts a user and returns its id. A taken login is a `Conflict`.
    async fn insert(&self, user: &NewUser) -> Result<i64, AppError>;

    /// Sets the ban flag. An unknown login is `NotFound`.
    async fn update_ban_status(&self, login: &str, banned: bool) -> Result<(), AppError>;

    async fn count_users(&self) -> Result<i64, AppError>;

    /// All users ordered by login
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError>;
}

struct UserTable {
    by_login: BTreeMap<String, UserModel>,
    next_id: i64,
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    table: Mutex<UserTable>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            table: Mutex::new(UserTable {
                by_login: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UserTable>, AppError> {
        self.table.lock().map_err(|_| {
            warn!("User table lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn find_by_login(&self, login: &str) -> Result<Option<UserModel>, AppError> {
        let user = self.lock()?.by_login.get(login).cloned();

        match &user {
            Some(u) => debug!(login = %login, user_id = u.id, "User found in memory"),
            None => debug!(login = %login, "User not found in memory"),
        }

        Ok(user)
    }

    #[instrument(skip(self, user), fields(login = %user.login))]
    async fn insert(&self, user: &NewUser) -> Result<i64, AppError> {
        let mut table = self.lock()?;
        if table.by_login.contains_key(&user.login) {
            warn!("Login already taken in memory");
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let id = table.next_id;
        table.next_id += 1;
        table.by_login.insert(
            user.login.clone(),
            UserModel {
                id,
                login: user.login.clone(),
                password_hash: user.password_hash.clone(),
                is_admin: user.is_admin,
                is_banned: false,
            },
        );

        debug!(user_id = id, "User created in memory");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn update_ban_status(&self, login: &str, banned: bool) -> Result<(), AppError> {
        let mut table = self.lock()?;
        let user = table.by_login.get_mut(login).ok_or_else(|| {
            warn!(login = %login, "User not found for ban update in memory");
            AppError::NotFound("User not found".to_string())
        })?;
        user.is_banned = banned;

        debug!(login = %login, banned, "Ban status updated in memory");
        Ok(())
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.lock()?.by_login.len() as i64)
    }

    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        Ok(self.lock()?.by_login.values().cloned().collect())
    }
}

/// SQLite implementation of user repository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn find_by_login(&self, login: &str) -> Result<Option<UserModel>, AppError> {
        debug!(login = %login, "Fetching user from database");

        sqlx::query_as::<_, UserModel>(
            "SELECT id, login, password_hash, is_admin, is_banned FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, login = %login, "Failed to fetch user from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self, user), fields(login = %user.login))]
    async fn insert(&self, user: &NewUser) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (login, password_hash, is_admin, is_banned) VALUES (?, ?, ?, 0)",
        )
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                warn!("Login already taken in database");
                AppError::Conflict("Login already exists".to_string())
            }
            _ => {
                warn!(error = %e, "Failed to insert user into database");
                AppError::DatabaseError(e.to_string())
            }
        })?;

        let id = result.last_insert_rowid();
        debug!(user_id = id, "User created in database");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn update_ban_status(&self, login: &str, banned: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_banned = ? WHERE login = ?")
            .bind(banned)
            .bind(login)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(login = %login, "User not found for ban update");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(login = %login, banned, "Ban status updated in database");
        Ok(())
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let users = sqlx::query_as::<_, UserModel>(
            "SELECT id, login, password_hash, is_admin, is_banned FROM users ORDER BY login",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::db;

    async fn sqlite_repo() -> SqliteUserRepository {
        SqliteUserRepository::new(db::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let repo = InMemoryUserRepository::new();

        let id = repo.insert(&NewUser::regular("alice", "h1")).await.unwrap();
        let user = repo.find_by_login("alice").await.unwrap().unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.password_hash, "h1");
        assert!(!user.is_admin);
        assert!(!user.is_banned);
        assert!(repo.find_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_login_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&NewUser::regular("alice", "h1")).await.unwrap();

        let result = repo.insert(&NewUser::regular("alice", "h2")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ban_status_and_listing_order() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&NewUser::regular("zoe", "h")).await.unwrap();
        repo.insert(&NewUser::admin("adam", "h")).await.unwrap();

        repo.update_ban_status("zoe", true).await.unwrap();
        let users = repo.list_users().await.unwrap();

        let logins: Vec<&str> = users.iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["adam", "zoe"]);
        assert!(users[1].is_banned);

        let missing = repo.update_ban_status("nobody", true).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_user_round_trip() {
        let repo = sqlite_repo().await;
        assert_eq!(repo.count_users().await.unwrap(), 0);

        let id = repo.insert(&NewUser::admin("root", "hash")).await.unwrap();
        let user = repo.find_by_login("root").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(user.is_admin);
        assert!(!user.is_banned);

        let duplicate = repo.insert(&NewUser::regular("root", "other")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        repo.insert(&NewUser::regular("bob", "hash")).await.unwrap();
        repo.update_ban_status("bob", true).await.unwrap();

        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].login, "bob");
        assert!(users[0].is_banned);
        assert_eq!(repo.count_users().await.unwrap(), 2);

        let missing = repo.update_ban_status("nobody", false).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
