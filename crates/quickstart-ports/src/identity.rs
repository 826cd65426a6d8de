use async_trait::async_trait;
use std::sync::Arc;

use quickstart_core::{OAuthTokens, QuickstartError, UserInfo};

/// OAuth2 identity provider used for delegated authorization.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// OAuth client id; its first label namespaces user ids.
    fn client_id(&self) -> &str;

    /// Consent-screen URL requesting offline access for the configured scopes.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, QuickstartError>;

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, QuickstartError>;

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, QuickstartError>;

    async fn revoke(&self, token: &str) -> Result<(), QuickstartError>;

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, QuickstartError>;
}

pub type DynIdentityProvider = Arc<dyn IdentityProvider>;
