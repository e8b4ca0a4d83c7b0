//! Logging and OpenTelemetry Tracing Setup
//!
//! Logs go to stderr (stdout carries outcomes in the binary), as JSON or
//! pretty text per `observability.logging.format`. OpenTelemetry export is
//! opt-in.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (default: `observability.logging.level`)
//! - `OTEL_ENABLED`: Set to `true` to export spans over OTLP
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (default: `http://localhost:4317`)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: `order-coordinator`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_coordinator::telemetry::init_telemetry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(&config.observability.logging);
//!     // ... application code
//! }
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    #[must_use]
    pub const fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Initialize logging, plus OpenTelemetry tracing when `OTEL_ENABLED=true`.
///
/// Returns a guard that will shut down the tracer provider when dropped.
/// A second call leaves the first subscriber in place.
#[must_use]
pub fn init_telemetry(logging: &LoggingConfig) -> TelemetryGuard {
    let otel_enabled = std::env::var("OTEL_ENABLED").is_ok_and(|v| v == "true");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "order-coordinator".to_string());

    let provider = if otel_enabled {
        build_provider(&endpoint)
    } else {
        None
    };
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.clone()))
    });

    let json = logging.format == LogFormat::Json;
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(logging.include_spans)
            .with_span_list(logging.include_spans)
    });
    let pretty_layer = (!json).then(|| fmt::layer().pretty().with_writer(std::io::stderr));

    if let Err(e) = Registry::default()
        .with(env_filter)
        .with(otel_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
    {
        eprintln!("Tracing subscriber already installed: {e}");
    }

    if provider.is_some() {
        tracing::info!(
            service_name = %service_name,
            endpoint = %endpoint,
            "OpenTelemetry initialized"
        );
    } else {
        tracing::debug!("OpenTelemetry disabled, logging only");
    }

    TelemetryGuard { provider }
}

fn build_provider(endpoint: &str) -> Option<SdkTracerProvider> {
    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => Some(
            SdkTracerProvider::builder()
                .with_simple_exporter(exporter)
                .build(),
        ),
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to logging only");
            None
        }
    }
}
