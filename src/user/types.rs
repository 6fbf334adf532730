use serde::{Deserialize, Serialize};

/// Request payload for registering a new account
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

/// One row of the admin user listing
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub login: String,
    pub is_banned: bool,
}

/// Request payload for banning or unbanning a user
#[derive(Debug, Deserialize)]
pub struct ManageBanRequest {
    pub login: String,
    pub banned: u8, // 0 = unban, 1 = ban
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ManageBanResponse {
    pub login: String,
    pub banned: u8,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}
