use async_trait::async_trait;

use super::{AuthError, Authenticator, Identity};

const UNVERIFIED_EMAIL: &str = "user@example.com";

/// Development authenticator: a token that looks like an email is taken as the
/// caller's email, anything else maps to a placeholder user. Nothing is verified.
#[derive(Debug, Clone, Default)]
pub struct HeaderAuthenticator;

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let email = if token.contains('@') {
            token
        } else {
            UNVERIFIED_EMAIL
        };

        Ok(Identity {
            email: email.to_string(),
        })
    }
}
