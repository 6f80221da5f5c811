mod gateway;
mod none;
mod traits;
mod types;

pub use gateway::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::Gateway => Ok(Box::new(GatewayAuthenticator::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMethod;

    #[test]
    fn test_create_authenticator_none() {
        let config = AuthConfig {
            method: AuthMethod::None,
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "none");
    }

    #[test]
    fn test_create_authenticator_gateway() {
        let config = AuthConfig {
            method: AuthMethod::Gateway,
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "gateway");
    }
}
