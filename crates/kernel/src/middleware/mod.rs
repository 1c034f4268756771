//! HTTP middleware.

pub mod bearer_auth;
pub mod metrics;

pub use bearer_auth::{AuthUser, TokenVerifier, authenticate_bearer};
pub use metrics::track_requests;
