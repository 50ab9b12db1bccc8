mod api_key;
mod none;
mod types;

pub use api_key::*;
pub use none::*;
pub use types::*;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using the api_key auth method".to_string(),
                    )
                })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_authenticator_none() {
        let config = AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        };
        assert_eq!(create_authenticator(&config).unwrap().method_name(), "none");
    }

    #[test]
    fn test_create_authenticator_api_key() {
        let config = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        };
        assert_eq!(
            create_authenticator(&config).unwrap().method_name(),
            "api_key"
        );
    }

    #[test]
    fn test_create_authenticator_api_key_missing_or_empty() {
        for api_key in [None, Some(String::new())] {
            let config = AuthConfig {
                method: AuthMethod::ApiKey,
                api_key,
            };
            assert!(matches!(
                create_authenticator(&config),
                Err(AuthError::ConfigurationError(_))
            ));
        }
    }
}
