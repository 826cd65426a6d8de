use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

use quickstart_core::QuickstartError;

use crate::{Task, TASK_ID_HEADER};

/// Executes a task. The queue calls this once per task.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, task: &Task) -> Result<(), QuickstartError>;
}

pub type DynTaskDispatcher = Arc<dyn TaskDispatcher>;

/// Replays tasks as HTTP requests against the application itself.
pub struct HttpTaskDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskDispatcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, QuickstartError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| QuickstartError::task_queue(&e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, task: &Task) -> String {
        format!("{}{}", self.base_url, task.path)
    }

    fn headers_for(task: &Task) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &task.headers {
            // Unrepresentable headers are skipped, not fatal.
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&task.id) {
            headers.insert(TASK_ID_HEADER, value);
        }
        if let Some(Ok(value)) = task.traceparent.as_deref().map(HeaderValue::from_str) {
            headers.insert("traceparent", value);
        }
        if let Some(Ok(value)) = task.tracestate.as_deref().map(HeaderValue::from_str) {
            headers.insert("tracestate", value);
        }
        headers
    }
}

#[async_trait]
impl TaskDispatcher for HttpTaskDispatcher {
    async fn dispatch(&self, task: &Task) -> Result<(), QuickstartError> {
        let method = reqwest::Method::from_bytes(task.method.as_bytes())
            .map_err(|e| QuickstartError::task_queue(&e.to_string()))?;

        let response = self
            .client
            .request(method, self.url_for(task))
            .headers(Self::headers_for(task))
            .body(task.payload.clone())
            .send()
            .await
            .map_err(|e| QuickstartError::task_queue(&e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuickstartError::task_queue(&format!(
                "task handler {} responded {status}",
                task.path
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let dispatcher = HttpTaskDispatcher::new("http://127.0.0.1:8080/").unwrap();
        let task = Task::post("/processnotification", Vec::new());
        assert_eq!(
            dispatcher.url_for(&task),
            "http://127.0.0.1:8080/processnotification"
        );
    }

    #[test]
    fn dispatch_headers_carry_task_id_and_skip_invalid_values() {
        let task = Task::post("/p", Vec::new())
            .with_headers(vec![("content-type", "application/json"), ("bad header", "x")]);
        let headers = HttpTaskDispatcher::headers_for(&task);

        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get(TASK_ID_HEADER).unwrap(), task.id.as_str());
        assert!(headers.get("bad header").is_none());
    }
}
