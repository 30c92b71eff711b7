use crate::Id;
use serde::{Deserialize, Serialize};

/// Request body for `POST /accounts/token/refresh/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefreshRequest {
    /// Refresh token issued alongside the expired access token.
    pub refresh: String,
}

/// Successful response body of `POST /accounts/token/refresh/`.
///
/// Additional fields (e.g. a rotated refresh token) are ignored, a missing `access` field is an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefreshResponse {
    /// Newly issued access token.
    pub access: String,
}

/// Request body for `POST /accounts/token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenObtainRequest {
    pub email: String,
    pub password: String,
}

/// Successful response body of `POST /accounts/token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Role of an authenticated dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Manages every location of the franchise.
    SuperAdmin,
    /// Manages a single assigned location.
    FranchiseAdmin,
}

/// Profile of the signed-in user as returned by `GET /accounts/me/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Id,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: AdminRole,
    /// Assigned location, only set for [`AdminRole::FranchiseAdmin`].
    #[serde(default)]
    pub location: Option<Id>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Returns whether the user may manage the given location.
    pub fn can_manage(&self, location_id: Id) -> bool {
        match self.role {
            AdminRole::SuperAdmin => true,
            AdminRole::FranchiseAdmin => self.location == Some(location_id),
        }
    }
}
