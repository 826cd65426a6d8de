//! Storage backend selection for the Mirror quickstart.
//!
//! Centralizes URL-based backend selection for credentials and wraps the chosen
//! implementation with `ObservedCredentialStore` for tracing.

use std::sync::Arc;

use quickstart_core::QuickstartError;

pub use quickstart_observability::ObservedCredentialStore;
pub use quickstart_ports::{CredentialStore, DynCredentialStore, DynMessageCache, MessageCache};

pub mod cache;

pub use cache::InMemoryMessageCache;

pub mod sqlx {
    pub use quickstart_storage_sqlx::SqlxCredentialStore;
}

/// Create a credential store based on URL scheme.
///
/// Supported: `postgres://...`, `postgresql://...` and `sqlite:...` (including
/// `sqlite::memory:`).
pub async fn create_credential_store(
    database_url: &str,
) -> Result<DynCredentialStore, QuickstartError> {
    if !(database_url.starts_with("postgres") || database_url.starts_with("sqlite:")) {
        return Err(QuickstartError::config(&format!(
            "unsupported database url scheme: {}",
            database_url.split(':').next().unwrap_or_default()
        )));
    }

    let store = sqlx::SqlxCredentialStore::new(database_url).await?;
    let db_system = store.db_system().to_string();

    let inner: DynCredentialStore = Arc::new(store);
    let observed = ObservedCredentialStore::new(inner, db_system);
    Ok(Arc::new(observed))
}

/// Process-local message cache. Messages do not survive a restart.
pub fn create_message_cache() -> DynMessageCache {
    Arc::new(InMemoryMessageCache::new())
}
