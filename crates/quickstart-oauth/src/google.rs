use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, RevocationUrl, Scope, StandardRevocableToken, TokenResponse,
    TokenUrl,
};
use std::borrow::Cow;

use quickstart_config::GoogleConfig;
use quickstart_core::{OAuthTokens, QuickstartError, UserInfo};
use quickstart_ports::IdentityProvider;

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointSet, EndpointSet>;

/// Authorization-code, refresh and revocation flows plus the userinfo lookup.
pub struct GoogleIdentityProvider {
    client: GoogleClient,
    client_id: String,
    scopes: Vec<String>,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: &GoogleConfig) -> Result<Self, QuickstartError> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| QuickstartError::config(&format!("invalid auth_url: {e}")))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| QuickstartError::config(&format!("invalid token_url: {e}")))?;
        let revocation_url = RevocationUrl::new(config.revoke_url.clone())
            .map_err(|e| QuickstartError::config(&format!("invalid revoke_url: {e}")))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_revocation_url(revocation_url);

        // Token and userinfo endpoints are never followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| QuickstartError::oauth(&format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            userinfo_url: config.userinfo_url.clone(),
            http,
        })
    }

    fn redirect_url(redirect_uri: &str) -> Result<RedirectUrl, QuickstartError> {
        RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| QuickstartError::oauth(&format!("invalid redirect uri: {e}")))
    }

    fn tokens_from(response: &BasicTokenResponse) -> OAuthTokens {
        OAuthTokens::new(
            response.access_token().secret().clone(),
            response.refresh_token().map(|t| t.secret().clone()),
            response.expires_in().map(|d| d.as_secs()),
        )
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, QuickstartError> {
        let redirect = Self::redirect_url(redirect_uri)?;
        let state = state.to_string();

        // Offline access plus forced consent so every grant carries a refresh token.
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_redirect_uri(Cow::Owned(redirect))
            .url();

        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, QuickstartError> {
        let redirect = Self::redirect_url(redirect_uri)?;
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_redirect_uri(Cow::Owned(redirect))
            .request_async(&self.http)
            .await
            .map_err(|e| QuickstartError::oauth(&format!("code exchange failed: {e}")))?;

        tracing::info!(
            has_refresh_token = response.refresh_token().is_some(),
            "authorization code exchanged"
        );
        Ok(Self::tokens_from(&response))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, QuickstartError> {
        let token = RefreshToken::new(refresh_token.to_string());
        let response = self
            .client
            .exchange_refresh_token(&token)
            .request_async(&self.http)
            .await
            .map_err(|e| QuickstartError::oauth(&format!("token refresh failed: {e}")))?;

        Ok(Self::tokens_from(&response))
    }

    async fn revoke(&self, token: &str) -> Result<(), QuickstartError> {
        // The endpoint takes access and refresh tokens under the same parameter.
        let revocable = StandardRevocableToken::RefreshToken(RefreshToken::new(token.to_string()));
        self.client
            .revoke_token(revocable)
            .map_err(|e| QuickstartError::oauth(&e.to_string()))?
            .request_async(&self.http)
            .await
            .map_err(|e| QuickstartError::oauth(&e.to_string()))?;

        Ok(())
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, QuickstartError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| QuickstartError::oauth(&format!("userinfo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuickstartError::remote(Some(status.as_u16()), &body)
                .context("userinfo request failed"));
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| QuickstartError::oauth(&format!("invalid userinfo response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config() -> GoogleConfig {
        GoogleConfig {
            client_id: "1234.apps.googleusercontent.com".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/glass.timeline".to_string(),
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
            ],
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://accounts.google.com/o/oauth2/token".to_string(),
            revoke_url: "https://accounts.google.com/o/oauth2/revoke".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }

    #[test]
    fn consent_url_requests_offline_access() {
        let provider = GoogleIdentityProvider::new(&config()).unwrap();
        let url = provider
            .authorize_url("http://localhost:8080/oauth2callback", "state-123")
            .unwrap();
        let url = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "state-123");
        assert_eq!(params["client_id"], "1234.apps.googleusercontent.com");
        assert_eq!(params["redirect_uri"], "http://localhost:8080/oauth2callback");
        assert!(params["scope"].contains("glass.timeline"));
    }

    #[test]
    fn malformed_endpoint_is_a_config_error() {
        let mut bad = config();
        bad.token_url = "not a url".to_string();
        let err = match GoogleIdentityProvider::new(&bad) {
            Ok(_) => panic!("expected config error"),
            Err(err) => err,
        };
        assert_eq!(err.error, "config_error");
    }

    #[test]
    fn invalid_redirect_is_rejected() {
        let provider = GoogleIdentityProvider::new(&config()).unwrap();
        assert!(provider.authorize_url("::nope", "s").is_err());
    }
}
