//! OTLP trace export, behind the `telemetry` feature. Spans carry the
//! configured service name plus this crate's version so decision
//! traces can be correlated across warden deployments.

use crate::config::TracingConfig;

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider as _;
#[cfg(feature = "telemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::trace::{Sampler, TracerProvider};

#[cfg(feature = "telemetry")]
fn sampler(rate: f64) -> Sampler {
    if rate >= 1.0 {
        Sampler::AlwaysOn
    } else {
        Sampler::TraceIdRatioBased(rate.max(0.0))
    }
}

#[cfg(feature = "telemetry")]
fn service_resource(config: &TracingConfig) -> opentelemetry_sdk::Resource {
    opentelemetry_sdk::Resource::new(vec![
        opentelemetry::KeyValue::new("service.name", config.service_name.clone()),
        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ])
}

#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TracingConfig) -> Option<TracerProvider> {
    if !config.enabled {
        return None;
    }

    let trace_config = opentelemetry_sdk::trace::Config::default()
        .with_sampler(sampler(config.sample_rate))
        .with_resource(service_resource(config));

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&config.otlp_endpoint),
        )
        .with_trace_config(trace_config)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .expect("failed to install OpenTelemetry tracer");

    Some(provider)
}

#[cfg(feature = "telemetry")]
pub fn make_otel_layer(
    provider: &TracerProvider,
) -> tracing_opentelemetry::OpenTelemetryLayer<
    tracing_subscriber::Registry,
    opentelemetry_sdk::trace::Tracer,
> {
    tracing_opentelemetry::layer().with_tracer(provider.tracer("warden-server"))
}

#[cfg(feature = "telemetry")]
pub fn shutdown_telemetry(provider: TracerProvider) {
    provider
        .shutdown()
        .expect("failed to shut down tracer provider");
}

#[cfg(not(feature = "telemetry"))]
pub fn init_telemetry(_config: &TracingConfig) -> Option<()> {
    None
}
