use crate::credentials::{Account, CredentialPair, CredentialStore};
use fadmin_protocol::http::auth::UserProfile;
use parking_lot::RwLock;

/// Process local [`CredentialStore`], nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    account: RwLock<Account>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: CredentialPair) -> Self {
        let store = Self::new();
        store.set_credentials(credentials);
        store
    }

    /// Snapshot of the stored account.
    pub fn account(&self) -> Account {
        self.account.read().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.account.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.account.read().refresh_token.clone()
    }

    fn set_access_token(&self, access_token: &str) {
        self.account.write().access_token = Some(access_token.to_string());
    }

    fn set_credentials(&self, credentials: CredentialPair) {
        let mut account = self.account.write();
        account.access_token = Some(credentials.access_token);
        account.refresh_token = Some(credentials.refresh_token);
    }

    fn user(&self) -> Option<UserProfile> {
        self.account.read().user.clone()
    }

    fn set_user(&self, user: UserProfile) {
        self.account.write().user = Some(user);
    }

    fn clear_all(&self) {
        *self.account.write() = Account::default();
    }
}
