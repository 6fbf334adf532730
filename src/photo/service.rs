use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{NewPhoto, PhotoModel},
    repository::PhotoRepository,
    storage::PhotoStorage,
    types::{PhotoResponse, PublicPhotoResponse},
};
use crate::access::{can_mutate_photo, can_view_photo};
use crate::session::Identity;
use crate::shared::AppError;

const FORBIDDEN_OR_MISSING: &str = "Forbidden or not found";

/// Service for photo business logic. Every read and write is checked
/// against the requester before the record or bytes are touched.
pub struct PhotoService {
    repository: Arc<dyn PhotoRepository + Send + Sync>,
    storage: PhotoStorage,
}

impl PhotoService {
    pub fn new(repository: Arc<dyn PhotoRepository + Send + Sync>, storage: PhotoStorage) -> Self {
        Self {
            repository,
            storage,
        }
    }

    /// Stores the bytes under the uploader's own login and records the photo
    #[instrument(skip(self, identity, bytes), fields(login = %identity.login, size = bytes.len()))]
    pub async fn upload(
        &self,
        identity: &Identity,
        file_name: &str,
        bytes: &[u8],
        is_public: bool,
    ) -> Result<i64, AppError> {
        let replacing = self
            .repository
            .find_by_owner_and_file(&identity.login, file_name)
            .await?
            .is_some();

        self.storage.save(&identity.login, file_name, bytes).await?;

        let upserted = self
            .repository
            .upsert(&NewPhoto {
                owner_id: identity.user_id,
                owner_login: identity.login.clone(),
                file_name: file_name.to_string(),
                is_public,
            })
            .await;

        let id = match upserted {
            Ok(id) => id,
            Err(e) => {
                // A replaced file still has its record; a new one must not outlive the failure
                if !replacing {
                    if let Err(cleanup) = self.storage.remove(&identity.login, file_name).await {
                        warn!(
                            file_name = %file_name,
                            error = %cleanup,
                            "Orphaned photo bytes left on disk"
                        );
                    }
                }
                return Err(e);
            }
        };

        info!(photo_id = id, is_public, "Photo uploaded");
        Ok(id)
    }

    /// The owner's photos that the requester is allowed to see
    #[instrument(skip(self, requester))]
    pub async fn list_for_owner(
        &self,
        requester: Option<&Identity>,
        owner_login: &str,
    ) -> Result<Vec<PhotoResponse>, AppError> {
        let requester_login = requester.map(|i| i.login.as_str());

        let photos = self
            .repository
            .list_by_owner(owner_login)
            .await?
            .into_iter()
            .filter(|p| can_view_photo(requester_login, &p.owner_login, p.is_public))
            .map(|p| PhotoResponse {
                filename: p.file_name,
                public: p.is_public,
            })
            .collect::<Vec<_>>();

        debug!(visible = photos.len(), "Photos listed");
        Ok(photos)
    }

    /// Photo bytes if visible to the requester. Missing and hidden look the same.
    #[instrument(skip(self, requester))]
    pub async fn fetch(
        &self,
        requester: Option<&Identity>,
        owner_login: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        let requester_login = requester.map(|i| i.login.as_str());

        let photo = self
            .repository
            .find_by_owner_and_file(owner_login, file_name)
            .await?
            .filter(|p| can_view_photo(requester_login, &p.owner_login, p.is_public))
            .ok_or_else(|| AppError::Forbidden(FORBIDDEN_OR_MISSING.to_string()))?;

        self.storage
            .read(&photo.owner_login, &photo.file_name)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    warn!(photo_id = photo.id, "Photo record has no bytes on disk");
                    AppError::Forbidden(FORBIDDEN_OR_MISSING.to_string())
                }
                other => other,
            })
    }

    #[instrument(skip(self, identity), fields(requester = %identity.login))]
    pub async fn delete(
        &self,
        identity: &Identity,
        owner_login: &str,
        file_name: &str,
    ) -> Result<(), AppError> {
        let photo = self.owned_photo(identity, owner_login, file_name).await?;

        self.repository.delete(photo.id).await?;

        // The record is gone, so the photo is deleted as far as callers can tell
        if let Err(e) = self.storage.remove(&photo.owner_login, &photo.file_name).await {
            warn!(
                photo_id = photo.id,
                error = %e,
                "Orphaned photo bytes left on disk"
            );
        }

        info!(photo_id = photo.id, "Photo deleted");
        Ok(())
    }

    /// Flips visibility of one of the requester's own photos
    #[instrument(skip(self, identity), fields(requester = %identity.login))]
    pub async fn set_visibility(
        &self,
        identity: &Identity,
        file_name: &str,
        is_public: bool,
    ) -> Result<(), AppError> {
        let photo = self.owned_photo(identity, &identity.login, file_name).await?;

        self.repository.update_visibility(photo.id, is_public).await?;

        info!(photo_id = photo.id, is_public, "Photo visibility updated");
        Ok(())
    }

    pub async fn public_gallery(&self) -> Result<Vec<PublicPhotoResponse>, AppError> {
        let gallery = self
            .repository
            .list_public_gallery()
            .await?
            .into_iter()
            .map(|p| PublicPhotoResponse {
                user: p.owner_login,
                filename: p.file_name,
            })
            .collect();
        Ok(gallery)
    }

    /// Resolves a photo the requester may mutate, keyed off the numeric user id
    async fn owned_photo(
        &self,
        identity: &Identity,
        owner_login: &str,
        file_name: &str,
    ) -> Result<PhotoModel, AppError> {
        let photo = self
            .repository
            .find_by_owner_and_file(owner_login, file_name)
            .await?;

        match photo {
            Some(photo) if can_mutate_photo(identity.user_id, photo.owner_id) => Ok(photo),
            _ => {
                warn!(
                    owner_login = %owner_login,
                    file_name = %file_name,
                    "Photo mutation denied"
                );
                Err(AppError::Forbidden("Forbidden".to_string()))
            }
        }
    }
}
