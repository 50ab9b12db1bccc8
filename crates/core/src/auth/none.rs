use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Lets every request through as `anonymous`. Only safe when the API
/// listens on an address the bot process alone can reach.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
