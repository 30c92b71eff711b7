use crate::auth::TokenService;
use crate::credentials::CredentialPair;
use crate::error::{Error, RefreshError};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// [`TokenService`] answering from memory.
///
/// `ana@example.org`/`hunter2` is the only accepted login, `ref1` the only accepted refresh token.
#[derive(Debug, Clone)]
pub struct MockTokenService {
    access_token: String,
    delay: Option<Duration>,
    failure: Option<RefreshError>,
    refresh_calls: Arc<AtomicUsize>,
}

impl MockTokenService {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            delay: None,
            failure: None,
            refresh_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, err: RefreshError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn obtain(&self, email: &str, password: &str) -> Result<CredentialPair, Error> {
        if email != "ana@example.org" || password != "hunter2" {
            return Err(Error::InvalidCredentials);
        }
        Ok(CredentialPair::new("tok1", "ref1"))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if refresh_token != "ref1" {
            return Err(RefreshError::Rejected { status: 401 });
        }
        Ok(self.access_token.clone())
    }
}
