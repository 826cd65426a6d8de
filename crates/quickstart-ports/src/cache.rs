use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use quickstart_core::QuickstartError;

/// Short-lived key/value cache used for one-shot status messages.
#[async_trait]
pub trait MessageCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), QuickstartError>;

    /// Read and delete `key`. Expired entries are reported as absent.
    async fn take(&self, key: &str) -> Result<Option<String>, QuickstartError>;
}

pub type DynMessageCache = Arc<dyn MessageCache>;
