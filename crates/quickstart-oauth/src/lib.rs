//! Delegated authorization against Google's OAuth2 endpoints.

mod google;

pub use google::GoogleIdentityProvider;
