use chrono::{DateTime, Utc};
use opentelemetry::propagation::Injector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header carrying the task id on dispatch.
pub const TASK_ID_HEADER: &str = "x-quickstart-task-id";

/// Request headers that describe the original connection and must not be replayed.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "te",
    "trailer",
    "expect",
];

/// A unit of deferred work, replayed later as `method path` against the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub payload: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,

    /// W3C trace context of the producing request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracestate: Option<String>,
}

impl Task {
    /// A POST task, with trace context captured from the current span.
    pub fn post(path: impl Into<String>, payload: Vec<u8>) -> Self {
        let (traceparent, tracestate) = extract_w3c_trace_context(&Span::current());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method: "POST".to_string(),
            path: path.into(),
            headers: Vec::new(),
            payload,
            enqueued_at: Utc::now(),
            traceparent,
            tracestate,
        }
    }

    /// Carry over request headers, skipping hop-by-hop ones.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            let name = name.into();
            if HOP_BY_HOP_HEADERS
                .iter()
                .any(|h| h.eq_ignore_ascii_case(&name))
            {
                continue;
            }
            self.headers.push((name, value.into()));
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn extract_w3c_trace_context(span: &Span) -> (Option<String>, Option<String>) {
    // Relies on the binary installing the W3C propagator.
    struct HeaderInjector<'a> {
        map: &'a mut HashMap<String, String>,
    }

    impl<'a> Injector for HeaderInjector<'a> {
        fn set(&mut self, key: &str, value: String) {
            self.map.insert(key.to_string(), value);
        }
    }

    let cx = span.context();
    let mut headers = HashMap::<String, String>::new();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector { map: &mut headers });
    });

    let traceparent = headers
        .get("traceparent")
        .cloned()
        .filter(|v| !v.trim().is_empty());
    let tracestate = headers
        .get("tracestate")
        .cloned()
        .filter(|v| !v.trim().is_empty());

    (traceparent, tracestate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_task_gets_fresh_id() {
        let a = Task::post("/processnotification", b"{}".to_vec());
        let b = Task::post("/processnotification", b"{}".to_vec());
        assert_eq!(a.method, "POST");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let task = Task::post("/p", Vec::new()).with_headers(vec![
            ("Host", "example.com"),
            ("Content-Type", "application/json"),
            ("Content-Length", "2"),
            ("X-Goog-Channel-Id", "abc"),
        ]);

        assert_eq!(task.headers.len(), 2);
        assert_eq!(task.header("content-type"), Some("application/json"));
        assert_eq!(task.header("x-goog-channel-id"), Some("abc"));
        assert_eq!(task.header("host"), None);
    }

    #[test]
    fn task_serializes_without_trace_context() {
        let task = Task::post("/p", b"x".to_vec());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["path"], "/p");
        assert!(json.get("traceparent").is_none());
    }
}
