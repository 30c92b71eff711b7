use crate::error::Error;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Everything needed to (re-)issue a backend call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_json<P: Serialize>(mut self, payload: &P) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets `Authorization: Bearer <token>`, replacing any previous value.
    pub fn with_bearer(mut self, token: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| Error::Credentials(format!("Invalid access token: {err}")))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.headers.get(AUTHORIZATION)
    }
}

/// One dispatch of a [`RequestDescriptor`].
///
/// Attempts are immutable, [`RequestAttempt::into_retry`] produces the single replay an attempt
/// is allowed after a token refresh.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    descriptor: RequestDescriptor,
    retried: bool,
}

impl RequestAttempt {
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self {
            descriptor,
            retried: false,
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub fn into_retry(self) -> Self {
        Self {
            descriptor: self.descriptor,
            retried: true,
        }
    }
}

/// A successful (2xx) backend response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<R: DeserializeOwned>(&self) -> Result<R, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Like [`ApiResponse::json`], but maps `204 No Content` and empty bodies to `R::default()`.
    pub fn json_or_default<R: DeserializeOwned + Default>(&self) -> Result<R, Error> {
        if self.status == StatusCode::NO_CONTENT || self.body.is_empty() {
            return Ok(R::default());
        }
        self.json()
    }
}
