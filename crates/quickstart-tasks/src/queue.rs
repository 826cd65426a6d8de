use async_trait::async_trait;
use std::sync::Arc;

use quickstart_core::QuickstartError;

use crate::Task;

/// Accepts tasks for later execution.
///
/// Delivery is best-effort: a successful enqueue does not guarantee the task runs.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Returns the task id.
    async fn enqueue(&self, task: Task) -> Result<String, QuickstartError>;
}

pub type DynTaskQueue = Arc<dyn TaskQueue>;
