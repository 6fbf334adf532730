use serde::{Deserialize, Serialize};

/// One entry of a user's photo listing
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PhotoResponse {
    pub filename: String,
    pub public: bool,
}

/// One entry of the public gallery
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicPhotoResponse {
    pub user: String,
    pub filename: String,
}

/// Request payload for flipping a photo's visibility
#[derive(Debug, Deserialize)]
pub struct UpdatePublicRequest {
    pub filename: String,
    pub public: u8, // 0 or 1
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UpdatePublicResponse {
    pub message: String,
    pub public: u8,
}
