use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

/// Prometheus collectors for the quickstart, registered on their own registry.
///
/// Cloning is cheap; every collector is reference counted internally.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_total_by_route: IntCounterVec,
    pub http_request_duration_seconds_by_route: HistogramVec,

    pub notifications_received_total: IntCounter,
    pub notifications_processed_total: IntCounterVec,
    pub notifications_dropped_total: IntCounterVec,

    pub tasks_enqueued_total: IntCounter,
    pub tasks_dispatched_total: IntCounter,
    pub tasks_failed_total: IntCounter,

    pub dashboard_operations_total: IntCounterVec,
    pub broadcast_failures_total: IntCounter,
    pub credentials_refreshed_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("quickstart".to_string()), None)?;

        let http_requests_total =
            IntCounter::with_opts(Opts::new("http_requests_total", "Total HTTP requests"))?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_total_by_route = IntCounterVec::new(
            Opts::new(
                "http_requests_by_route_total",
                "HTTP requests by method, route and status",
            ),
            &["method", "route", "status"],
        )?;
        let http_request_duration_seconds_by_route = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_by_route_seconds",
                "HTTP request latency by method, route and status",
            ),
            &["method", "route", "status"],
        )?;

        let notifications_received_total = IntCounter::with_opts(Opts::new(
            "notifications_received_total",
            "Push notifications accepted by /notify",
        ))?;
        let notifications_processed_total = IntCounterVec::new(
            Opts::new(
                "notifications_processed_total",
                "Notifications handled by the deferred processor, by collection",
            ),
            &["collection"],
        )?;
        let notifications_dropped_total = IntCounterVec::new(
            Opts::new(
                "notifications_dropped_total",
                "Notifications the deferred processor could not act on, by reason",
            ),
            &["reason"],
        )?;

        let tasks_enqueued_total =
            IntCounter::with_opts(Opts::new("tasks_enqueued_total", "Deferred tasks enqueued"))?;
        let tasks_dispatched_total = IntCounter::with_opts(Opts::new(
            "tasks_dispatched_total",
            "Deferred tasks delivered to their handler",
        ))?;
        let tasks_failed_total = IntCounter::with_opts(Opts::new(
            "tasks_failed_total",
            "Deferred tasks whose delivery failed",
        ))?;

        let dashboard_operations_total = IntCounterVec::new(
            Opts::new(
                "dashboard_operations_total",
                "Dashboard form operations, by operation name",
            ),
            &["operation"],
        )?;
        let broadcast_failures_total = IntCounter::with_opts(Opts::new(
            "broadcast_failures_total",
            "Per-user insert failures during broadcast",
        ))?;
        let credentials_refreshed_total = IntCounter::with_opts(Opts::new(
            "credentials_refreshed_total",
            "Access tokens refreshed before use",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_total_by_route.clone()))?;
        registry.register(Box::new(http_request_duration_seconds_by_route.clone()))?;
        registry.register(Box::new(notifications_received_total.clone()))?;
        registry.register(Box::new(notifications_processed_total.clone()))?;
        registry.register(Box::new(notifications_dropped_total.clone()))?;
        registry.register(Box::new(tasks_enqueued_total.clone()))?;
        registry.register(Box::new(tasks_dispatched_total.clone()))?;
        registry.register(Box::new(tasks_failed_total.clone()))?;
        registry.register(Box::new(dashboard_operations_total.clone()))?;
        registry.register(Box::new(broadcast_failures_total.clone()))?;
        registry.register(Box::new(credentials_refreshed_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_total_by_route,
            http_request_duration_seconds_by_route,
            notifications_received_total,
            notifications_processed_total,
            notifications_dropped_total,
            tasks_enqueued_total,
            tasks_dispatched_total,
            tasks_failed_total,
            dashboard_operations_total,
            broadcast_failures_total,
            credentials_refreshed_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collectors_render_with_namespace() {
        let metrics = Metrics::new().expect("metrics");
        metrics.notifications_received_total.inc();
        metrics
            .dashboard_operations_total
            .with_label_values(&["insertItem"])
            .inc();

        let text = String::from_utf8(crate::encode_prometheus_text(&metrics.registry).unwrap())
            .expect("utf8");
        assert!(text.contains("quickstart_notifications_received_total 1"));
        assert!(text.contains("operation=\"insertItem\""));
    }

    #[test]
    fn separate_instances_do_not_share_counts() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.tasks_enqueued_total.inc();
        assert_eq!(a.tasks_enqueued_total.get(), 1);
        assert_eq!(b.tasks_enqueued_total.get(), 0);
    }
}
