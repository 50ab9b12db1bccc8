use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No API credentials on request")]
    NotAuthenticated,

    #[error("API credentials rejected: {0}")]
    InvalidCredentials(String),

    #[error("Auth misconfigured: {0}")]
    ConfigurationError(String),
}

/// Decides which API client sent a request. Implementations must not
/// touch the stores.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    fn method_name(&self) -> &'static str;
}

/// What an authenticator gets to look at. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The API client behind a request (typically the bot frontend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable, non-secret name for the caller, used in logs.
    pub client: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            client: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}
