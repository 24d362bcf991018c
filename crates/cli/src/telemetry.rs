//! Tracing subscriber and optional OTLP span export.

use anyhow::{Context, Result};
use clap::ValueEnum;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Spans are exported over OTLP when this variable is set and non-empty.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const SERVICE_NAME: &str = "modus-infra";

/// Log line rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human-readable output.
    Pretty,
}

/// Installed observability. Call [`shutdown`](Self::shutdown) before exit so
/// buffered spans are flushed.
#[derive(Debug)]
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Installs the global subscriber. Filtering follows `RUST_LOG`, `info`
    /// when unset. Logs go to stderr; stdout is reserved for the manifest.
    ///
    /// Must run inside a Tokio runtime when OTLP export is enabled.
    pub fn init(format: LogFormat) -> Result<Self> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let provider = match std::env::var(OTLP_ENDPOINT_ENV) {
            Ok(endpoint) if !endpoint.trim().is_empty() => Some(otlp_provider(&endpoint)?),
            _ => None,
        };
        let otel_layer = provider.as_ref().map(|provider| {
            tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
        });

        let json_layer = (format == LogFormat::Json).then(|| {
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
        });
        let pretty_layer = (format == LogFormat::Pretty).then(|| {
            fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(false)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(pretty_layer)
            .with(otel_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(otlp = provider.is_some(), ?format, "Tracing initialized");
        Ok(Self { provider })
    }

    /// Flushes and stops span export, if enabled.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "OpenTelemetry shutdown failed");
            }
        }
    }
}

fn otlp_provider(endpoint: &str) -> Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("Failed to create OTLP exporter for {endpoint}"))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build())
}
