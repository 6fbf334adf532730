use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

use super::models::{NewPhoto, PhotoModel};
use crate::shared::AppError;
use crate::user::repository::UserRepository;

/// Trait for photo store operations
#[async_trait]
pub trait PhotoRepository {
    async fn find_by_owner_and_file(
        &self,
        owner_login: &str,
        file_name: &str,
    ) -> Result<Option<PhotoModel>, AppError>;

    /// Photos of one owner in upload order
    async fn list_by_owner(&self, owner_login: &str) -> Result<Vec<PhotoModel>, AppError>;

    /// Inserts the photo, or updates visibility if the owner already has that file name
    async fn upsert(&self, photo: &NewPhoto) -> Result<i64, AppError>;

    async fn update_visibility(&self, photo_id: i64, is_public: bool) -> Result<(), AppError>;

    async fn delete(&self, photo_id: i64) -> Result<(), AppError>;

    /// Public photos whose owners are not banned, newest first
    async fn list_public_gallery(&self) -> Result<Vec<PhotoModel>, AppError>;
}

struct PhotoTable {
    by_id: BTreeMap<i64, PhotoModel>,
    next_id: i64,
}

/// In-memory implementation of PhotoRepository for development and testing.
///
/// Ban state lives with the users, so the gallery consults the user repository.
pub struct InMemoryPhotoRepository {
    table: Mutex<PhotoTable>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl InMemoryPhotoRepository {
    pub fn new(users: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self {
            table: Mutex::new(PhotoTable {
                by_id: BTreeMap::new(),
                next_id: 1,
            }),
            users,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PhotoTable>, AppError> {
        self.table.lock().map_err(|_| {
            warn!("Photo table lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl PhotoRepository for InMemoryPhotoRepository {
    async fn find_by_owner_and_file(
        &self,
        owner_login: &str,
        file_name: &str,
    ) -> Result<Option<PhotoModel>, AppError> {
        let table = self.lock()?;
        Ok(table
            .by_id
            .values()
            .find(|p| p.owner_login == owner_login && p.file_name == file_name)
            .cloned())
    }

    async fn list_by_owner(&self, owner_login: &str) -> Result<Vec<PhotoModel>, AppError> {
        let table = self.lock()?;
        Ok(table
            .by_id
            .values()
            .filter(|p| p.owner_login == owner_login)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, photo), fields(owner_id = photo.owner_id, file_name = %photo.file_name))]
    async fn upsert(&self, photo: &NewPhoto) -> Result<i64, AppError> {
        let mut table = self.lock()?;

        let existing = table
            .by_id
            .values_mut()
            .find(|p| p.owner_id == photo.owner_id && p.file_name == photo.file_name);
        if let Some(existing) = existing {
            existing.is_public = photo.is_public;
            debug!(photo_id = existing.id, "Photo replaced in memory");
            return Ok(existing.id);
        }

        let id = table.next_id;
        table.next_id += 1;
        table.by_id.insert(
            id,
            PhotoModel {
                id,
                owner_id: photo.owner_id,
                owner_login: photo.owner_login.clone(),
                file_name: photo.file_name.clone(),
                is_public: photo.is_public,
            },
        );

        debug!(photo_id = id, "Photo stored in memory");
        Ok(id)
    }

    async fn update_visibility(&self, photo_id: i64, is_public: bool) -> Result<(), AppError> {
        let mut table = self.lock()?;
        let photo = table
            .by_id
            .get_mut(&photo_id)
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;
        photo.is_public = is_public;
        Ok(())
    }

    async fn delete(&self, photo_id: i64) -> Result<(), AppError> {
        let mut table = self.lock()?;
        if table.by_id.remove(&photo_id).is_none() {
            warn!(photo_id, "Photo not found for deletion in memory");
            return Err(AppError::NotFound("Photo not found".to_string()));
        }
        Ok(())
    }

    async fn list_public_gallery(&self) -> Result<Vec<PhotoModel>, AppError> {
        let public: Vec<PhotoModel> = {
            let table = self.lock()?;
            table
                .by_id
                .values()
                .rev()
                .filter(|p| p.is_public)
                .cloned()
                .collect()
        };

        let mut gallery = Vec::with_capacity(public.len());
        for photo in public {
            let banned = self
                .users
                .find_by_login(&photo.owner_login)
                .await?
                .map(|u| u.is_banned)
                .unwrap_or(true);
            if !banned {
                gallery.push(photo);
            }
        }
        Ok(gallery)
    }
}

const SELECT_PHOTO: &str = "SELECT p.id, p.user_id AS owner_id, u.login AS owner_login, \
     p.file_name, p.is_public FROM photos p JOIN users u ON p.user_id = u.id";

/// SQLite implementation of photo repository
pub struct SqlitePhotoRepository {
    pool: SqlitePool,
}

impl SqlitePhotoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepository for SqlitePhotoRepository {
    #[instrument(skip(self))]
    async fn find_by_owner_and_file(
        &self,
        owner_login: &str,
        file_name: &str,
    ) -> Result<Option<PhotoModel>, AppError> {
        let photo = sqlx::query_as::<_, PhotoModel>(&format!(
            "{SELECT_PHOTO} WHERE u.login = ? AND p.file_name = ?"
        ))
        .bind(owner_login)
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    async fn list_by_owner(&self, owner_login: &str) -> Result<Vec<PhotoModel>, AppError> {
        let photos = sqlx::query_as::<_, PhotoModel>(&format!(
            "{SELECT_PHOTO} WHERE u.login = ? ORDER BY p.id"
        ))
        .bind(owner_login)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    #[instrument(skip(self, photo), fields(owner_id = photo.owner_id, file_name = %photo.file_name))]
    async fn upsert(&self, photo: &NewPhoto) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO photos (file_name, is_public, user_id) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, file_name) DO UPDATE SET is_public = excluded.is_public \
             RETURNING id",
        )
        .bind(&photo.file_name)
        .bind(photo.is_public)
        .bind(photo.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store photo in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(photo_id = id, "Photo stored in database");
        Ok(id)
    }

    async fn update_visibility(&self, photo_id: i64, is_public: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE photos SET is_public = ? WHERE id = ?")
            .bind(is_public)
            .bind(photo_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Photo not found".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, photo_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(photo_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(photo_id, "Photo not found for deletion");
            return Err(AppError::NotFound("Photo not found".to_string()));
        }
        Ok(())
    }

    async fn list_public_gallery(&self) -> Result<Vec<PhotoModel>, AppError> {
        let photos = sqlx::query_as::<_, PhotoModel>(&format!(
            "{SELECT_PHOTO} WHERE p.is_public = 1 AND u.is_banned = 0 ORDER BY p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }
}
