use crate::config::Config;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

const DEFAULT_FILTER: &str = "support_router=debug,tower_http=info";

pub struct ObservabilityGuard;

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        shutdown();
    }
}

/// Install the tracing subscriber and the Prometheus exporter. Keep the
/// returned guard alive for the life of the process.
pub fn init(config: &Config) -> Result<ObservabilityGuard, Box<dyn std::error::Error>> {
    init_tracing(config)?;
    init_metrics(config)?;
    describe_metrics();
    Ok(ObservabilityGuard)
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true);

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    if let Some(endpoint) = &config.otel_exporter_endpoint {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", config.service_name.clone()),
            ])))
            .install_batch(runtime::Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    } else {
        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    Ok(())
}

fn init_metrics(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()?;

    tracing::info!(
        "Prometheus exporter listening on port {}",
        config.metrics_port
    );
    Ok(())
}

/// Register help text for the routing metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "routing_requests_total",
        "Routed messages by response source and intent"
    );
    metrics::describe_histogram!(
        "routing_response_time_ms",
        metrics::Unit::Milliseconds,
        "End-to-end routing time per message"
    );
    metrics::describe_counter!(
        "cache_lookups_total",
        "Cache lookups by cache type and hit/miss result"
    );
    metrics::describe_counter!(
        "routing_slow_responses_total",
        "Responses slower than the configured alert threshold"
    );
    metrics::describe_counter!(
        "conversation_escalations_total",
        "Conversation escalations by reason"
    );
}

pub fn shutdown() {
    global::shutdown_tracer_provider();
}
