use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens returned by the identity provider after a code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `None` when the provider did not report a lifetime.
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthTokens {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in_secs: Option<u64>) -> Self {
        let expiry = expires_in_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Self {
            access_token,
            refresh_token,
            expiry,
        }
    }
}

/// The single persisted entity: a user's OAuth token triple.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(user_id: String, tokens: OAuthTokens) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expiry: tokens.expiry,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a refreshed token set.
    ///
    /// Providers don't always hand out a new refresh token, so the old one is
    /// kept unless a replacement arrives.
    pub fn refreshed(mut self, tokens: OAuthTokens) -> Self {
        self.access_token = tokens.access_token;
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
        self.expiry = tokens.expiry;
        self.updated_at = Utc::now();
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    /// True when the access token expires within `leeway` of `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.is_expired_at(now + leeway)
    }

    /// The token to hand to the provider's revocation endpoint.
    ///
    /// Revoking the refresh token also invalidates access tokens minted from it.
    pub fn revocable_token(&self) -> &str {
        self.refresh_token.as_deref().unwrap_or(&self.access_token)
    }
}
