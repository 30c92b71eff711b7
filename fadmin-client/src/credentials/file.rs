use crate::credentials::{Account, CredentialPair, CredentialStore};
use anyhow::Context;
use fadmin_protocol::http::auth::UserProfile;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};

/// [`CredentialStore`] persisting the [`Account`] as JSON on disk.
///
/// The account is kept in memory and written through on every change. Write failures are logged
/// and the in-memory state stays authoritative, so a read-only disk degrades to a session that
/// does not survive a restart.
pub struct FileCredentialStore {
    account: RwLock<Account>,
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let account = if path.as_ref().exists() {
            Self::load(path.as_ref())
        } else {
            tracing::debug!(path = %path.as_ref().display(), "No persisted account on disk");
            Account::default()
        };

        Self {
            account: RwLock::new(account),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Account {
        tracing::debug!(path = %path.as_ref().display(), "Loading persisted account");
        let parsed = fs::read_to_string(path.as_ref())
            .context("Failed to read account file")
            .and_then(|data| {
                serde_json::from_str::<Account>(&data).context("Failed to parse account file")
            });

        match parsed {
            Ok(account) => account,
            Err(err) => {
                tracing::error!("{err:#}");
                tracing::warn!("Resetting persisted account, re-authentication will be required");

                let corrupted_path = path.as_ref().with_extension("corrupted");
                if let Err(err) = fs::rename(path.as_ref(), corrupted_path.as_path()) {
                    tracing::warn!(?err, "Failed to preserve corrupted account file");
                    fs::remove_file(path.as_ref()).ok();
                }

                Account::default()
            }
        }
    }

    /// Snapshot of the account as kept in memory.
    pub fn account(&self) -> Account {
        self.account.read().clone()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let account = self.account.write();
        self.write(&account)
    }

    fn write(&self, account: &Account) -> anyhow::Result<()> {
        tracing::trace!(path = %self.path.display(), "Saving account to disk");

        if account.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).context("Failed to remove account file")?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create account directory")?;
        }

        let data = serde_json::to_string_pretty(account).context("Failed to serialize account")?;
        fs::write(&self.path, data).context("Failed to write account file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .context("Failed to restrict account file permissions")?;
        }

        Ok(())
    }

    /// Applies `f` and persists the result. The write lock is held until the file is written, so
    /// the file always reflects the last in-memory change.
    fn update(&self, f: impl FnOnce(&mut Account)) {
        let mut account = self.account.write();
        f(&mut account);
        if let Err(err) = self.write(&account) {
            tracing::error!("Failed to persist account: {err:#}");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.account.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.account.read().refresh_token.clone()
    }

    fn set_access_token(&self, access_token: &str) {
        self.update(|account| account.access_token = Some(access_token.to_string()));
    }

    fn set_credentials(&self, credentials: CredentialPair) {
        self.update(|account| {
            account.access_token = Some(credentials.access_token);
            account.refresh_token = Some(credentials.refresh_token);
        });
    }

    fn user(&self) -> Option<UserProfile> {
        self.account.read().user.clone()
    }

    fn set_user(&self, user: UserProfile) {
        self.update(|account| account.user = Some(user));
    }

    fn clear_all(&self) {
        self.update(|account| *account = Account::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fadmin_protocol::http::auth::AdminRole;
    use pretty_assertions::assert_eq;

    fn user() -> UserProfile {
        UserProfile {
            id: 7,
            email: "ana@example.org".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lee".to_string(),
            role: AdminRole::FranchiseAdmin,
            location: Some(3),
        }
    }

    fn persisted(path: &Path) -> Account {
        if path.exists() {
            FileCredentialStore::load(path)
        } else {
            Account::default()
        }
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("account.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.access_token(), None);
        store.set_credentials(CredentialPair::new("tok1", "ref1"));
        store.set_user(user());
        store.set_access_token("tok2");

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("tok2"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("ref1"));
        assert_eq!(reopened.user(), Some(user()));
    }

    #[cfg(unix)]
    #[test]
    fn restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        FileCredentialStore::new(&path).set_credentials(CredentialPair::new("tok1", "ref1"));

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_all_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");

        let store = FileCredentialStore::new(&path);
        store.set_credentials(CredentialPair::new("tok1", "ref1"));
        assert!(path.exists());

        store.clear_all();
        assert!(!path.exists());
        assert_eq!(store.refresh_token(), None);
        assert!(FileCredentialStore::new(&path).refresh_token().is_none());
    }

    #[test]
    fn corrupted_file_resets_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.access_token(), None);
        assert!(!path.exists());
        assert!(path.with_extension("corrupted").exists());
    }

    #[test]
    fn concurrent_updates_persist_last_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        let store = FileCredentialStore::new(&path);

        for round in 0..20 {
            store.set_credentials(CredentialPair::new("tok1", "ref1"));
            std::thread::scope(|scope| {
                scope.spawn(|| store.set_access_token(&format!("tok{}", round + 2)));
                scope.spawn(|| store.clear_all());
                scope.spawn(|| store.set_user(user()));
            });

            assert_eq!(persisted(&path), store.account(), "round {round}");
        }
    }
}
