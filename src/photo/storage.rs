use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::shared::AppError;

/// True when `name` can be used as a single directory or file name
pub fn is_safe_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Raw photo bytes on disk, laid out as `<root>/<login>/<file_name>`
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, login: &str, file_name: &str) -> Result<PathBuf, AppError> {
        if !is_safe_path_component(login) || !is_safe_path_component(file_name) {
            warn!(login = %login, file_name = %file_name, "Rejected unsafe photo path");
            return Err(AppError::BadRequest("Invalid file name".to_string()));
        }
        Ok(self.root.join(login).join(file_name))
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, login: &str, file_name: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.path_for(login, file_name)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(storage_error)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(storage_error)?;

        debug!(path = %path.display(), "Photo bytes written");
        Ok(())
    }

    pub async fn read(&self, login: &str, file_name: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(login, file_name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotFound("Photo file missing".to_string()),
            _ => storage_error(e),
        })
    }

    /// Removes the bytes. A file that is already gone is not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, login: &str, file_name: &str) -> Result<(), AppError> {
        let path = self.path_for(login, file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Photo file already absent");
                Ok(())
            }
            Err(e) => Err(storage_error(e)),
        }
    }
}

fn storage_error(e: std::io::Error) -> AppError {
    warn!(error = %e, "Photo storage I/O failed");
    AppError::StorageError(e.to_string())
}
