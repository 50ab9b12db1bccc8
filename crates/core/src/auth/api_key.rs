//! Shared-secret authentication for the bot frontend.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Validates requests against a single configured API key.
///
/// The key is accepted in `Authorization: Bearer <key>` (any case of
/// "bearer") or in `X-API-Key: <key>`.
pub struct ApiKeyAuthenticator {
    expected_key: String,
    client: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        // Name the client after a digest prefix so logs never carry the key.
        let digest = format!("{:x}", Sha256::digest(api_key.as_bytes()));
        Self {
            client: format!("key-{}", &digest[..8]),
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        let bearer = request.header("authorization").and_then(|value| {
            let (scheme, key) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| key.trim())
        });
        bearer.or_else(|| request.header("x-api-key"))
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                client: self.client.clone(),
                method: self.method_name().to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Byte comparison whose running time does not depend on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let request = make_request(&[("Authorization", "Bearer secret-key-123")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert!(identity.client.starts_with("key-"));
        assert!(!identity.client.contains("secret"));
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_bearer_scheme_case_insensitive() {
        let auth = ApiKeyAuthenticator::new("k".to_string());
        for value in ["bearer k", "BEARER k"] {
            let request = make_request(&[("Authorization", value)]);
            assert!(auth.authenticate(&request).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let request = make_request(&[("X-API-Key", "secret-key-123")]);

        assert!(auth.authenticate(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let request = make_request(&[("Authorization", "Bearer wrong-key")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());

        let result = auth.authenticate(&make_request(&[])).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_same_key_same_client() {
        let a = ApiKeyAuthenticator::new("k1".to_string());
        let b = ApiKeyAuthenticator::new("k1".to_string());
        let c = ApiKeyAuthenticator::new("k2".to_string());
        let request = |key: &str| make_request(&[("X-API-Key", key)]);

        let id_a = a.authenticate(&request("k1")).await.unwrap();
        let id_b = b.authenticate(&request("k1")).await.unwrap();
        let id_c = c.authenticate(&request("k2")).await.unwrap();
        assert_eq!(id_a.client, id_b.client);
        assert_ne!(id_a.client, id_c.client);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
