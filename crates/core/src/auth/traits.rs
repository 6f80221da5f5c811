use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    /// No identity was presented at all.
    #[error("Authentication required")]
    NotAuthenticated,

    /// An identity was presented but is incomplete or malformed.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Resolves the caller behind a request. Content is scoped to the
/// organization of the returned identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
