use std::sync::OnceLock;

use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Initialize tracing/logging and (optionally) OpenTelemetry export.
///
/// - Always emits structured JSON logs via `tracing_subscriber`.
/// - Bridges `log` records into `tracing`.
/// - When `OTEL_EXPORTER_OTLP_ENDPOINT` (or the traces-specific variant) is set,
///   spans are exported via OTLP. Otherwise a local provider still generates
///   trace/span IDs so log lines can be correlated.
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    // `QUICKSTART_OTLP_ENDPOINT` is accepted as a shorthand for the standard variable.
    if non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT").is_none()
        && non_empty_env("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT").is_none()
    {
        if let Some(endpoint) = non_empty_env("QUICKSTART_OTLP_ENDPOINT") {
            std::env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", endpoint);
        }
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // W3C trace-context (traceparent/tracestate).
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let otlp_endpoint_set = non_empty_env("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT").is_some()
        || non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT").is_some();

    let mut builder = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)));

    if otlp_endpoint_set {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()?;
        builder = builder.with_batch_exporter(exporter);
    }

    let provider = builder.build();
    let tracer = provider.tracer(service_name.to_string());
    global::set_tracer_provider(provider.clone());
    let _ = TRACER_PROVIDER.set(provider);

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // with_current_span + with_span_list put the active span stack (and the
    // trace_id/span_id recorded on it) into every JSON line.
    let formatting_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(formatting_layer)
        .init();

    // Ignore errors if a logger was already set (e.g., tests).
    let _ = tracing_log::LogTracer::init();

    Ok(())
}

/// Record OpenTelemetry trace/span identifiers onto a span that declared
/// `trace_id` and `span_id` as empty fields.
pub fn annotate_span_with_trace_ids(span: &Span) {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    let cx = span.context();
    let otel_span = cx.span();
    let sc = otel_span.span_context();
    if sc.is_valid() {
        span.record("trace_id", tracing::field::display(sc.trace_id()));
        span.record("span_id", tracing::field::display(sc.span_id()));
    }
}

pub fn shutdown_telemetry() {
    // Flush any pending spans.
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {err}");
        }
    }
}
