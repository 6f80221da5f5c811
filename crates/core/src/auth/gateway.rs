//! Identity supplied by a trusted upstream gateway.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

/// Authenticator that trusts identity headers set by an API gateway.
///
/// The gateway has already verified the caller; this only requires that both
/// `x-user-id` and `x-organization-id` are present and non-empty.
pub struct GatewayAuthenticator;

impl GatewayAuthenticator {
    pub fn new() -> Self {
        Self
    }

    fn header<'a>(request: &'a AuthRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl Default for GatewayAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for GatewayAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let user_id = Self::header(request, USER_ID_HEADER).ok_or(AuthError::NotAuthenticated)?;
        let organization_id = Self::header(request, ORGANIZATION_ID_HEADER).ok_or_else(|| {
            AuthError::InvalidCredentials("missing organization header".to_string())
        })?;

        Ok(Identity {
            user_id: user_id.to_string(),
            organization_id: organization_id.to_string(),
            method: "gateway".to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_gateway_headers_become_identity() {
        let auth = GatewayAuthenticator::new();
        let request = make_request(vec![("X-User-Id", "u-1"), ("X-Organization-Id", "org-1")]);

        let identity = auth.authenticate(&request).await.unwrap();
        assert_eq!(identity.user_id, "u-1");
        assert_eq!(identity.organization_id, "org-1");
        assert_eq!(identity.method, "gateway");
    }

    #[tokio::test]
    async fn test_missing_user_header() {
        let auth = GatewayAuthenticator::new();
        let request = make_request(vec![("x-organization-id", "org-1")]);
        let result = auth.authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_missing_organization_header() {
        let auth = GatewayAuthenticator::new();
        let request = make_request(vec![("x-user-id", "u-1")]);
        let result = auth.authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_blank_headers_rejected() {
        let auth = GatewayAuthenticator::new();
        let request = make_request(vec![("x-user-id", "  "), ("x-organization-id", "org-1")]);
        assert!(auth.authenticate(&request).await.is_err());
    }
}
