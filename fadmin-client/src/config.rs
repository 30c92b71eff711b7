use anyhow::Context;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use fadmin_protocol::Id;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-Agent string used for all HTTP requests.
pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
pub const APP_NAME: &str = "fadmin";
pub const DEFAULT_SETTINGS_FILE_NAME: &str = "config.toml";
pub const CREDENTIALS_FILE_NAME: &str = "account.json";
pub const SESSION_EVENTS_CHANNEL_SIZE: usize = 16;
/// Placeholder substituted with the location ID in location scoped endpoint templates.
pub const LOCATION_ID_PLACEHOLDER: &str = "{location_id}";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Layers the built-in defaults, an optional `config.toml` in `config_dir`, an optional
    /// `config.toml` in the working directory and `FADMIN__*` environment variables.
    pub fn parse(config_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);

        if let Some(config_dir) = config_dir {
            builder = builder.add_source(
                File::with_name(
                    config_dir
                        .join(DEFAULT_SETTINGS_FILE_NAME)
                        .to_str()
                        .context("Failed to get local config path")?,
                )
                .required(false),
            );
        }

        builder
            .add_source(File::with_name(DEFAULT_SETTINGS_FILE_NAME).required(false))
            .add_source(
                Environment::with_prefix("fadmin")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build config")?
            .try_deserialize()
            .context("Failed to deserialize config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub endpoints: BackendEndpointsConfig,
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            endpoints: BackendEndpointsConfig::default(),
            timeout_ms: 10000,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn endpoint_url(&self, endpoint: BackendEndpoint) -> String {
        self.url_for(&self.endpoint_path(endpoint))
    }

    /// Returns the path of the given endpoint relative to the base URL.
    pub fn endpoint_path(&self, endpoint: BackendEndpoint) -> String {
        let (template, location_id) = match endpoint {
            BackendEndpoint::TokenObtain => (&self.endpoints.token_obtain, None),
            BackendEndpoint::TokenRefresh => (&self.endpoints.token_refresh, None),
            BackendEndpoint::Profile => (&self.endpoints.profile, None),
            BackendEndpoint::Locations => (&self.endpoints.locations, None),
            BackendEndpoint::MenuCategories(id) => (&self.endpoints.menu_categories, Some(id)),
            BackendEndpoint::MenuItems(id) => (&self.endpoints.menu_items, Some(id)),
            BackendEndpoint::Staff(id) => (&self.endpoints.staff, Some(id)),
            BackendEndpoint::Orders(id) => (&self.endpoints.orders, Some(id)),
            BackendEndpoint::Feedback(id) => (&self.endpoints.feedback, Some(id)),
        };
        match location_id {
            Some(id) => template.replace(LOCATION_ID_PLACEHOLDER, &id.to_string()),
            None => template.clone(),
        }
    }

    /// Resolves a request path against the base URL. Absolute URLs are returned unchanged.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEndpoint {
    TokenObtain,
    TokenRefresh,
    Profile,
    Locations,
    MenuCategories(Id),
    MenuItems(Id),
    Staff(Id),
    Orders(Id),
    Feedback(Id),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEndpointsConfig {
    pub token_obtain: String,
    pub token_refresh: String,
    pub profile: String,
    pub locations: String,
    pub menu_categories: String,
    pub menu_items: String,
    pub staff: String,
    pub orders: String,
    pub feedback: String,
}

impl Default for BackendEndpointsConfig {
    fn default() -> Self {
        Self {
            token_obtain: "/accounts/token/".to_string(),
            token_refresh: "/accounts/token/refresh/".to_string(),
            profile: "/accounts/me/".to_string(),
            locations: "/locations/".to_string(),
            menu_categories: "/locations/{location_id}/menu/categories/".to_string(),
            menu_items: "/locations/{location_id}/menu/items/".to_string(),
            staff: "/locations/{location_id}/staff/".to_string(),
            orders: "/locations/{location_id}/orders/".to_string(),
            feedback: "/locations/{location_id}/feedback/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target the host is asked to navigate to once the session cannot be recovered.
    pub unauthenticated_redirect: String,
    /// Location of the persisted account, `None` uses the platform data directory.
    pub credentials_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            unauthenticated_redirect: "/".to_string(),
            credentials_file: None,
        }
    }
}

impl SessionConfig {
    /// Configured credentials file, or `account.json` in the per-user data directory.
    pub fn credentials_path(&self) -> anyhow::Result<PathBuf> {
        match &self.credentials_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(CREDENTIALS_FILE_NAME)),
        }
    }
}

/// Per-user data directory following the platform conventions, e.g. `~/.local/share/fadmin` on
/// Linux or `~/Library/Application Support/fadmin` on macOS.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Failed to determine home directory for the data directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs;

    /// Sets environment variables for the lifetime of the guard.
    struct EnvGuard(Vec<&'static str>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                unsafe { std::env::set_var(key, value) };
            }
            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.0 {
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.session.unauthenticated_redirect, "/");
        assert_eq!(
            config.backend.endpoint_url(BackendEndpoint::TokenRefresh),
            "http://localhost:8000/api/accounts/token/refresh/"
        );
    }

    #[test]
    fn location_scoped_endpoints() {
        let backend = BackendConfig::default();
        assert_eq!(
            backend.endpoint_path(BackendEndpoint::Staff(42)),
            "/locations/42/staff/"
        );
        assert_eq!(
            backend.endpoint_url(BackendEndpoint::MenuItems(7)),
            "http://localhost:8000/api/locations/7/menu/items/"
        );
    }

    #[test]
    fn url_for() {
        let backend = BackendConfig {
            base_url: "https://api.example.org/".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.url_for("/orders/"), "https://api.example.org/orders/");
        assert_eq!(backend.url_for("orders/"), "https://api.example.org/orders/");
        assert_eq!(
            backend.url_for("https://cdn.example.org/x"),
            "https://cdn.example.org/x"
        );
    }

    #[test]
    #[serial]
    fn parse_config_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(DEFAULT_SETTINGS_FILE_NAME),
            "[backend]\nbase_url = \"https://api.example.org\"\ntimeout_ms = 2500\n\n[session]\nunauthenticated_redirect = \"/login\"\n",
        )?;

        let config = ClientConfig::parse(Some(dir.path()))?;
        assert_eq!(config.backend.base_url, "https://api.example.org");
        assert_eq!(config.backend.timeout_ms, 2500);
        assert_eq!(config.session.unauthenticated_redirect, "/login");
        assert_eq!(
            config.backend.endpoints.token_refresh,
            "/accounts/token/refresh/"
        );
        Ok(())
    }

    #[test]
    #[serial]
    fn environment_overrides_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(DEFAULT_SETTINGS_FILE_NAME),
            "[backend]\ntimeout_ms = 2500\n",
        )?;
        let _env = EnvGuard::set(&[
            ("FADMIN__BACKEND__TIMEOUT_MS", "1234"),
            ("FADMIN__SESSION__UNAUTHENTICATED_REDIRECT", "/login"),
        ]);

        let config = ClientConfig::parse(Some(dir.path()))?;
        assert_eq!(config.backend.timeout(), Duration::from_millis(1234));
        assert_eq!(config.session.unauthenticated_redirect, "/login");
        assert_eq!(config.backend.base_url, "http://localhost:8000/api");
        Ok(())
    }

    #[test]
    fn credentials_path() -> anyhow::Result<()> {
        let session = SessionConfig {
            credentials_file: Some(PathBuf::from("/tmp/fadmin/account.json")),
            ..Default::default()
        };
        assert_eq!(
            session.credentials_path()?,
            PathBuf::from("/tmp/fadmin/account.json")
        );

        let default_path = SessionConfig::default().credentials_path()?;
        assert!(default_path.is_absolute());
        assert!(default_path.ends_with(CREDENTIALS_FILE_NAME));
        assert_eq!(default_path.parent(), Some(data_dir()?.as_path()));
        Ok(())
    }
}
