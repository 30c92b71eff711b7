pub mod connect;
#[cfg(test)]
pub mod mock;

pub use connect::HttpTokenService;

use crate::credentials::CredentialPair;
use crate::error::{Error, RefreshError};
use async_trait::async_trait;

/// Token exchanges with the backend's account endpoints.
///
/// Implementations must never route their calls through the request pipeline, otherwise a failing
/// refresh would be intercepted by the very pipeline waiting on it.
#[async_trait]
pub trait TokenService: Send + Sync + 'static {
    /// Exchanges email and password for a fresh [`CredentialPair`].
    async fn obtain(&self, email: &str, password: &str) -> Result<CredentialPair, Error>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError>;
}
