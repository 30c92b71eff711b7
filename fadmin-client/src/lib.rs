pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod navigation;
pub mod pipeline;
pub mod request;
mod session;

pub use crate::error::{Error, RefreshError};
pub use crate::pipeline::{ApiClient, ApiClientBuilder};
pub use crate::request::{ApiResponse, RequestDescriptor};
