mod header;

pub use header::*;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error::AppError, AppState};

/// Fallback header consulted when no bearer token is sent.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const ANONYMOUS_EMAIL: &str = "test@example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidToken(String),
    #[error("identity provider unavailable: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Turns a bearer token into a caller identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

impl FromRef<AppState> for Arc<dyn Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

fn fallback_identity(headers: &HeaderMap) -> Identity {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_EMAIL);

    Identity {
        email: email.to_string(),
    }
}

/// Resolves the caller once per request and stores it in the request extensions.
/// A token the authenticator rejects leaves the request without an identity.
pub async fn attach_identity(
    State(authenticator): State<Arc<dyn Authenticator>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let identity = match AuthBearer::from_request_parts(&mut parts, &()).await {
        Ok(AuthBearer(token)) => match authenticator.verify(&token).await {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::warn!("Rejected bearer token: {}", err);
                None
            }
        },
        Err(_) => Some(fallback_identity(&parts.headers)),
    };

    if let Some(identity) = identity {
        parts.extensions.insert(identity);
    }

    next.run(Request::from_parts(parts, body)).await
}

/// The identity attached by [`attach_identity`].
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized access".to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_fallback_uses_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("b@x.com"));
        assert_eq!(fallback_identity(&headers).email, "b@x.com");
    }

    #[test]
    fn test_fallback_without_header() {
        assert_eq!(fallback_identity(&HeaderMap::new()).email, ANONYMOUS_EMAIL);
    }
}
