pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use fadmin_protocol::http::auth::{TokenPair, UserProfile};
use serde::{Deserialize, Serialize};

/// Access and refresh token issued together by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl From<TokenPair> for CredentialPair {
    fn from(pair: TokenPair) -> Self {
        Self::new(pair.access, pair.refresh)
    }
}

/// Everything persisted about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Account {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Owner of the current credentials. The request pipeline reads tokens before every request and
/// writes the new access token after a refresh, it never touches the persistence format itself.
pub trait CredentialStore: Send + Sync + 'static {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_access_token(&self, access_token: &str);
    fn set_credentials(&self, credentials: CredentialPair);
    fn user(&self) -> Option<UserProfile>;
    fn set_user(&self, user: UserProfile);
    /// Removes both tokens and the user profile.
    fn clear_all(&self);
}
