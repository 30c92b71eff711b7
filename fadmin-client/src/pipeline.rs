use crate::auth::{HttpTokenService, TokenService};
use crate::config::{APP_USER_AGENT, BackendConfig, ClientConfig};
use crate::coordinator::{RefreshCoordinator, RefreshOutcome, RefreshRole};
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::Error;
use crate::navigation::{Navigator, SessionEvents};
use crate::request::{ApiResponse, RequestAttempt, RequestDescriptor};
use anyhow::Context;
use parking_lot::RwLock;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{Instrument, instrument};
use url::Url;

/// Authenticated HTTP client for the franchise management backend.
///
/// Every call goes through [`ApiClient::request`], which attaches the current bearer token and
/// recovers from an expired access token with a single token refresh shared by all concurrent
/// callers. Cloning is cheap, clones share credentials and refresh state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    config: BackendConfig,
    unauthenticated_redirect: String,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenService>,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator,
    /// Token attached when the credential store has none, updated after every refresh.
    default_token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    pub(crate) fn tokens(&self) -> &Arc<dyn TokenService> {
        &self.inner.tokens
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Value of the default `Authorization` header, e.g. `Bearer tok2`.
    pub fn default_authorization(&self) -> Option<String> {
        self.inner
            .default_token
            .read()
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }

    pub(crate) fn set_default_token(&self, token: Option<&str>) {
        *self.inner.default_token.write() = token.map(str::to_string);
    }

    /// Access token the next dispatch would carry.
    pub fn current_token(&self) -> Option<String> {
        self.inner
            .credentials
            .access_token()
            .or_else(|| self.inner.default_token.read().clone())
    }

    /// Attaches the current access token to `descriptor`. Without a token the descriptor is
    /// returned unchanged.
    pub fn authorize(&self, descriptor: RequestDescriptor) -> Result<RequestDescriptor, Error> {
        match self.current_token() {
            Some(token) => descriptor.with_bearer(&token),
            None => Ok(descriptor),
        }
    }

    /// Performs an authenticated request.
    ///
    /// A `401 Unauthorized` on the first attempt triggers a token refresh (or joins the one in
    /// flight) followed by exactly one replay carrying the new token. A 401 on the replay, and any
    /// other error, is returned as is.
    #[instrument(
        level = "debug",
        skip_all,
        fields(method = %descriptor.method, path = %descriptor.path),
        err
    )]
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, Error> {
        let attempt = RequestAttempt::new(descriptor);
        let token = self.current_token();

        match self.dispatch(&attempt, token.as_deref()).await {
            Err(Error::Unauthorized) if !attempt.is_retry() => {
                tracing::debug!("Access token rejected, awaiting refresh");
                let token = self.await_refresh(token).await?;

                tracing::trace!("Replaying request with refreshed access token");
                self.dispatch(&attempt.into_retry(), Some(&token)).await
            }
            result => result,
        }
    }

    /// Leads a new refresh or waits for the one in flight.
    async fn await_refresh(&self, rejected_token: Option<String>) -> RefreshOutcome {
        match self.inner.coordinator.begin_or_join() {
            RefreshRole::Follower(subscription) => {
                tracing::debug!("Waiting for in-flight token refresh");
                subscription.wait().await
            }
            RefreshRole::Leader(lease) => {
                // runs detached so dropping this request does not cancel the refresh others await
                let client = self.clone();
                let refresh = tokio::spawn(
                    async move {
                        let outcome = client.refresh_access_token(rejected_token).await;
                        lease.settle(outcome.clone());
                        outcome
                    }
                    .in_current_span(),
                );
                refresh.await.unwrap_or_else(|err| {
                    tracing::error!(?err, "Token refresh task failed");
                    Err(Error::RefreshAbandoned)
                })
            }
        }
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn refresh_access_token(&self, rejected_token: Option<String>) -> RefreshOutcome {
        let credentials = &self.inner.credentials;

        if let Some(current) = credentials.access_token()
            && rejected_token.as_deref() != Some(current.as_str())
        {
            tracing::debug!("Access token changed since dispatch, skipping refresh");
            self.set_default_token(Some(&current));
            return Ok(current);
        }

        let Some(refresh_token) = credentials.refresh_token() else {
            tracing::warn!("No refresh token available, ending session");
            self.end_session();
            return Err(Error::Unauthorized);
        };

        match self.inner.tokens.refresh(&refresh_token).await {
            Ok(access_token) => {
                credentials.set_access_token(&access_token);
                self.set_default_token(Some(&access_token));
                self.inner.navigator.token_refreshed();
                tracing::info!("Access token refreshed");
                Ok(access_token)
            }
            Err(err) => {
                tracing::warn!(?err, "Token refresh failed, ending session");
                self.end_session();
                Err(Error::Refresh(err))
            }
        }
    }

    /// Drops all credentials and asks the host to return to the unauthenticated entry point.
    fn end_session(&self) {
        self.inner.credentials.clear_all();
        self.set_default_token(None);
        self.inner
            .navigator
            .navigate(&self.inner.unauthenticated_redirect);
    }

    async fn dispatch(
        &self,
        attempt: &RequestAttempt,
        token: Option<&str>,
    ) -> Result<ApiResponse, Error> {
        let descriptor = match token {
            Some(token) => attempt.descriptor().clone().with_bearer(token)?,
            None => attempt.descriptor().clone(),
        };
        let request_url = self.request_url(&descriptor)?;

        tracing::trace!(retry = attempt.is_retry(), url = %request_url, "Performing HTTP request");
        let request = self
            .inner
            .http
            .request(descriptor.method, request_url)
            .headers(descriptor.headers);
        let request = match &descriptor.body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::trace!(retry = attempt.is_retry(), "HTTP request unauthorized");
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            tracing::trace!(status = status.as_u16(), "HTTP request received non-OK status");
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn request_url(&self, descriptor: &RequestDescriptor) -> anyhow::Result<Url> {
        let url = self.inner.config.url_for(&descriptor.path);
        if descriptor.query.is_empty() {
            Url::parse(&url).context("Failed to parse HTTP request URL")
        } else {
            Url::parse_with_params(&url, &descriptor.query)
                .context("Failed to parse HTTP request URL with params")
        }
    }

    pub async fn get_json<R>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<R, Error>
    where
        R: DeserializeOwned + Default,
    {
        let mut descriptor = RequestDescriptor::get(path);
        for (key, value) in query.unwrap_or_default() {
            descriptor = descriptor.with_query(*key, *value);
        }
        self.request(descriptor).await?.json_or_default()
    }

    pub async fn post_json<R, P>(&self, path: &str, payload: Option<&P>) -> Result<R, Error>
    where
        R: DeserializeOwned + Default,
        P: Serialize,
    {
        self.send_json(RequestDescriptor::post(path), payload).await
    }

    pub async fn put_json<R, P>(&self, path: &str, payload: &P) -> Result<R, Error>
    where
        R: DeserializeOwned + Default,
        P: Serialize,
    {
        self.send_json(RequestDescriptor::put(path), Some(payload)).await
    }

    pub async fn patch_json<R, P>(&self, path: &str, payload: &P) -> Result<R, Error>
    where
        R: DeserializeOwned + Default,
        P: Serialize,
    {
        self.send_json(RequestDescriptor::patch(path), Some(payload)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.request(RequestDescriptor::delete(path)).await?;
        Ok(())
    }

    async fn send_json<R, P>(
        &self,
        descriptor: RequestDescriptor,
        payload: Option<&P>,
    ) -> Result<R, Error>
    where
        R: DeserializeOwned + Default,
        P: Serialize,
    {
        let descriptor = match payload {
            Some(payload) => descriptor.with_json(payload)?,
            None => descriptor,
        };
        self.request(descriptor).await?.json_or_default()
    }
}

pub struct ApiClientBuilder {
    config: ClientConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
    tokens: Option<Arc<dyn TokenService>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credentials: None,
            tokens: None,
            navigator: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_token_service(mut self, tokens: Arc<dyn TokenService>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> anyhow::Result<ApiClient> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::ClientBuilder::new()
            .user_agent(APP_USER_AGENT)
            .default_headers(default_headers)
            .timeout(self.config.backend.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(HttpTokenService::new(&self.config.backend)?),
        };

        Ok(ApiClient {
            inner: Arc::new(ApiClientInner {
                config: self.config.backend,
                unauthenticated_redirect: self.config.session.unauthenticated_redirect,
                http,
                credentials: self
                    .credentials
                    .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
                tokens,
                navigator: self
                    .navigator
                    .unwrap_or_else(|| Arc::new(SessionEvents::new())),
                coordinator: RefreshCoordinator::new(),
                default_token: RwLock::new(None),
            }),
        })
    }
}
