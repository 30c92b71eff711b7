use crate::config::BackendEndpoint;
use crate::error::Error;
use crate::pipeline::ApiClient;
use crate::request::RequestDescriptor;
use fadmin_protocol::http::auth::UserProfile;
use tracing::instrument;

impl ApiClient {
    /// Exchanges email and password for a token pair, stores it and loads the user's profile.
    #[instrument(level = "debug", skip(self, password), err)]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, Error> {
        let credentials = self.tokens().obtain(email, password).await?;
        self.credentials().set_credentials(credentials);
        self.set_default_token(None);

        let user = match self.fetch_profile().await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(?err, "Failed to fetch profile after login, discarding tokens");
                self.credentials().clear_all();
                return Err(err);
            }
        };

        tracing::info!(email = %user.email, role = ?user.role, "Logged in");
        self.navigator().logged_in(&user);
        Ok(user)
    }

    /// Fetches the signed-in user's profile and updates the stored copy.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_profile(&self) -> Result<UserProfile, Error> {
        let path = self.config().endpoint_path(BackendEndpoint::Profile);
        let user = self
            .request(RequestDescriptor::get(path))
            .await?
            .json::<UserProfile>()?;
        self.credentials().set_user(user.clone());
        Ok(user)
    }

    /// Profile stored with the current session, if any.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.credentials().user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials().refresh_token().is_some()
    }

    /// Ends the session locally. The backend keeps no session state for bearer tokens.
    #[instrument(level = "debug", skip(self))]
    pub fn logout(&self) {
        self.credentials().clear_all();
        self.set_default_token(None);
        self.navigator().logged_out();
        tracing::info!("Logged out");
    }
}
