//! Wire types exchanged with the franchise management REST backend.

pub mod http;

/// Identifier type used by the backend for every resource.
pub type Id = u64;
