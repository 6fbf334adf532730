//! Per-resource authorization decisions.
//!
//! These functions only look at the facts they are handed. They never touch a
//! store, never fail, and never cache anything.

use strum_macros::{Display, IntoStaticStr};

use crate::shared::AppError;

/// Why an admin action was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum DenyReason {
    NotAdmin,
    SelfBanForbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDecision {
    Allow,
    Deny(DenyReason),
}

impl BanDecision {
    /// Maps a denial onto the client-visible forbidden outcome
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            BanDecision::Allow => Ok(()),
            BanDecision::Deny(reason) => Err(AppError::Forbidden(reason.to_string())),
        }
    }
}

/// Public photos are visible to everyone, private ones only to their owner.
///
/// Keyed off the login because the gallery URLs address photos by login and
/// anonymous requesters have no user id at all.
pub fn can_view_photo(requester_login: Option<&str>, owner_login: &str, is_public: bool) -> bool {
    is_public || requester_login == Some(owner_login)
}

/// Only the owner, matched by numeric id, may delete a photo or flip its visibility
pub fn can_mutate_photo(requester_user_id: i64, owner_user_id: i64) -> bool {
    requester_user_id == owner_user_id
}

pub fn can_ban(requester_login: &str, target_login: &str, requester_is_admin: bool) -> BanDecision {
    if !requester_is_admin {
        return BanDecision::Deny(DenyReason::NotAdmin);
    }
    if requester_login == target_login {
        return BanDecision::Deny(DenyReason::SelfBanForbidden);
    }
    BanDecision::Allow
}
