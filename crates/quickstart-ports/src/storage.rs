use async_trait::async_trait;
use std::sync::Arc;

use quickstart_core::{Credential, QuickstartError};

/// Trait implemented by all credential persistence backends.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Initialize the backing store (e.g., bootstrap schema).
    async fn init(&self) -> Result<(), QuickstartError>;

    /// Insert or replace the credential for `credential.user_id`.
    async fn save_credential(&self, credential: &Credential) -> Result<(), QuickstartError>;

    async fn get_credential(&self, user_id: &str) -> Result<Option<Credential>, QuickstartError>;

    /// Remove the credential. Deleting a missing row is not an error.
    async fn delete_credential(&self, user_id: &str) -> Result<(), QuickstartError>;

    async fn count_credentials(&self) -> Result<i64, QuickstartError>;

    async fn list_credentials(&self) -> Result<Vec<Credential>, QuickstartError>;

    /// Lightweight liveness/readiness check.
    ///
    /// Implementations may override to do something cheaper than `init()`.
    async fn healthcheck(&self) -> Result<(), QuickstartError> {
        self.init().await
    }
}

pub type DynCredentialStore = Arc<dyn CredentialStore>;
