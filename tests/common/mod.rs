#![allow(dead_code)]

pub mod fakes;

use chrono::{Duration, Utc};
use quickstart_core::{Credential, OAuthTokens};
use quickstart_ports::CredentialStore;

pub fn credential(user_id: &str, access: &str, refresh: Option<&str>) -> Credential {
    Credential::new(
        user_id.to_string(),
        OAuthTokens {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expiry: Some(Utc::now() + Duration::hours(1)),
        },
    )
}

/// A minimal contract test suite that every `CredentialStore` backend must satisfy.
pub async fn run_credential_store_contract(
    store: &dyn CredentialStore,
) -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(store.count_credentials().await?, 0);
    assert!(store.get_credential("app_missing").await?.is_none());

    // Roundtrip
    let first = credential("app_1", "access_1", Some("refresh_1"));
    store.save_credential(&first).await?;

    let fetched = store
        .get_credential("app_1")
        .await?
        .ok_or_else(|| std::io::Error::other("credential should exist"))?;
    assert_eq!(fetched.access_token, "access_1");
    assert_eq!(fetched.refresh_token.as_deref(), Some("refresh_1"));
    assert!(fetched.expiry.is_some());

    // Saving again replaces the token set for the same user.
    let replaced = fetched.clone().refreshed(OAuthTokens {
        access_token: "access_2".to_string(),
        refresh_token: None,
        expiry: None,
    });
    store.save_credential(&replaced).await?;

    let fetched = store
        .get_credential("app_1")
        .await?
        .ok_or_else(|| std::io::Error::other("credential should still exist"))?;
    assert_eq!(fetched.access_token, "access_2");
    assert_eq!(fetched.refresh_token.as_deref(), Some("refresh_1"));
    assert!(fetched.expiry.is_none());
    assert_eq!(store.count_credentials().await?, 1);

    // Listing is ordered by user id.
    store
        .save_credential(&credential("app_0", "access_0", None))
        .await?;
    let all = store.list_credentials().await?;
    let ids: Vec<&str> = all.iter().map(|c| c.user_id.as_str()).collect();
    assert_eq!(ids, vec!["app_0", "app_1"]);

    // Deleting is idempotent.
    store.delete_credential("app_1").await?;
    store.delete_credential("app_1").await?;
    assert!(store.get_credential("app_1").await?.is_none());
    assert_eq!(store.count_credentials().await?, 1);

    store.healthcheck().await?;
    Ok(())
}
