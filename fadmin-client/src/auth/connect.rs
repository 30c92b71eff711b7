use crate::auth::TokenService;
use crate::config::{APP_USER_AGENT, BackendConfig, BackendEndpoint};
use crate::credentials::CredentialPair;
use crate::error::{Error, RefreshError};
use anyhow::Context;
use async_trait::async_trait;
use fadmin_protocol::http::auth::{
    TokenObtainRequest, TokenPair, TokenRefreshRequest, TokenRefreshResponse,
};
use reqwest::StatusCode;
use tracing::instrument;

/// [`TokenService`] talking to the backend's `/accounts/token/` endpoints over its own bare HTTP
/// client.
pub struct HttpTokenService {
    client: reqwest::Client,
    obtain_url: String,
    refresh_url: String,
}

impl HttpTokenService {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            obtain_url: config.endpoint_url(BackendEndpoint::TokenObtain),
            refresh_url: config.endpoint_url(BackendEndpoint::TokenRefresh),
        })
    }
}

#[async_trait]
impl TokenService for HttpTokenService {
    #[instrument(level = "debug", skip_all, err)]
    async fn obtain(&self, email: &str, password: &str) -> Result<CredentialPair, Error> {
        tracing::trace!(url = %self.obtain_url, "Requesting token pair");
        let response = self
            .client
            .post(self.obtain_url.as_str())
            .json(&TokenObtainRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                tracing::debug!(status = response.status().as_u16(), "Credentials rejected");
                return Err(Error::InvalidCredentials);
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        let pair = response
            .json::<TokenPair>()
            .await
            .map_err(|err| Error::Decode(err.to_string()))?;

        tracing::debug!("Obtained token pair");
        Ok(pair.into())
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        tracing::trace!(url = %self.refresh_url, "Refreshing access token");
        let response = self
            .client
            .post(self.refresh_url.as_str())
            .json(&TokenRefreshRequest {
                refresh: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|err| RefreshError::Network(err.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "Refresh rejected");
            return Err(RefreshError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| RefreshError::Network(err.to_string()))?;
        let refreshed = serde_json::from_slice::<TokenRefreshResponse>(&body)
            .map_err(|err| RefreshError::MalformedResponse(err.to_string()))?;

        tracing::debug!("Access token refreshed");
        Ok(refreshed.access)
    }
}
