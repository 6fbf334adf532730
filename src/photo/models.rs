use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for photos table, joined with the owner's login
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoModel {
    pub id: i64,
    pub owner_id: i64,
    pub owner_login: String,
    pub file_name: String,
    pub is_public: bool,
}

/// Photo record to be stored. Re-uploading the same file name updates the existing row.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub owner_id: i64,
    pub owner_login: String,
    pub file_name: String,
    pub is_public: bool,
}
