use fadmin_client::ApiClient;
use fadmin_client::config::ClientConfig;
use fadmin_client::credentials::CredentialStore;
use fadmin_client::navigation::Navigator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Navigator remembering every redirect and refresh notification.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
    refreshed: AtomicUsize,
}

#[allow(unused)]
impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }

    pub fn refreshed(&self) -> usize {
        self.refreshed.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.redirects.lock().push(path.to_string());
    }

    fn token_refreshed(&self) {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
    }
}

#[allow(unused)]
pub struct TestBackend {
    pub server: MockServer,
    pub client: ApiClient,
    pub navigator: Arc<RecordingNavigator>,
}

#[allow(unused)]
impl TestBackend {
    /// Starts a mock backend and a client using the real HTTP token service against it.
    pub async fn new(store: Arc<dyn CredentialStore>) -> Self {
        let server = MockServer::start().await;
        let navigator = Arc::new(RecordingNavigator::default());

        let mut config = ClientConfig::default();
        config.backend.base_url = server.uri();
        config.backend.timeout_ms = 500;

        let client = ApiClient::builder(config)
            .with_credentials(store)
            .with_navigator(navigator.clone())
            .build()
            .expect("Failed to build client");

        Self {
            server,
            client,
            navigator,
        }
    }

    /// Mounts a refresh endpoint exchanging `ref1` for `access_token` after `delay`, expected to
    /// be called exactly `expected` times.
    pub async fn mount_refresh(&self, access_token: &str, delay: Duration, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/accounts/token/refresh/"))
            .and(body_json(serde_json::json!({"refresh": "ref1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access": access_token}))
                    .set_delay(delay),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Mounts a refresh endpoint rejecting every refresh token.
    pub async fn mount_refresh_rejected(&self, delay: Duration, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/accounts/token/refresh/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Token is invalid or expired"}))
                    .set_delay(delay),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Mounts a `GET` endpoint answering `body` to `Bearer <accepted_token>` and 401 to anything
    /// else.
    pub async fn mount_protected(
        &self,
        endpoint: &str,
        accepted_token: &str,
        body: serde_json::Value,
    ) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header(
                "Authorization",
                format!("Bearer {accepted_token}").as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .with_priority(1)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"code": "token_not_valid"})),
            )
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// `Authorization` headers the backend received on `endpoint`, in arrival order.
    pub async fn authorizations(&self, endpoint: &str) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == endpoint)
            .filter_map(|request| {
                request
                    .headers
                    .get("Authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
            .collect()
    }
}

#[allow(unused)]
pub fn profile() -> serde_json::Value {
    serde_json::json!({
        "id": 7,
        "email": "ana@example.org",
        "first_name": "Ana",
        "last_name": "Lima",
        "role": "franchise_admin",
        "location": 3
    })
}
