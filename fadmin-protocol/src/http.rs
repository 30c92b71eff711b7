#[cfg(feature = "auth")]
pub mod auth;
#[cfg(feature = "resources")]
pub mod resources;
