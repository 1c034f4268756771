//! Bearer token authentication middleware.
//!
//! Token issuance lives with the external identity provider; this layer
//! only verifies the HS256 signature and hands the verified claims to the
//! handlers. `sub` and `email` are trusted as-is after verification.

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Verified caller identity, injected into request extensions.
///
/// Two identity namespaces, used consistently: `sub` is the opaque subject
/// id that ownership compares; `email` is the verified address that viewer
/// lists compare. They never stand in for each other.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub sub: String,
    pub email: String,
}

/// Claims expected in an access token.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Verifies bearer tokens against the shared HMAC secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and extract the caller identity.
    pub fn verify(&self, token: &str) -> Result<AuthUser, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(AuthUser {
            sub: data.claims.sub,
            email: data.claims.email,
        })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

/// Middleware to authenticate Bearer JWT tokens.
///
/// A valid token sets the caller identity in request extensions. No token
/// passes through unchanged; handlers that need identity reject via the
/// `AuthUser` extractor. An invalid token is a hard 401.
pub async fn authenticate_bearer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let Some(header) = header else {
        return next.run(request).await;
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return next.run(request).await;
    };

    match state.auth().verify(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "invalid bearer token");
            (
                StatusCode::UNAUTHORIZED,
                [("WWW-Authenticate", "Bearer error=\"invalid_token\"")],
                "Invalid token",
            )
                .into_response()
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
