//! Tracing subscriber initialization with optional OpenTelemetry export.
//!
//! Log lines go to stderr so that command output on stdout stays parseable.
//!
//! ```no_run
//! // Plain structured logs at `info` unless RUST_LOG says otherwise
//! startstop_observe::init_tracing(false, "info").unwrap();
//!
//! // Also bridge lifecycle spans to OpenTelemetry (stdout exporter)
//! startstop_observe::init_tracing(true, "startstop_core=debug").unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tracer name reported on exported spans.
const TRACER_NAME: &str = "startstop";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the level filter: `RUST_LOG` when set, `fallback` otherwise.
fn env_filter(fallback: &str) -> Result<EnvFilter, TracingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => parse_filter(&directives),
        _ => parse_filter(fallback),
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TracingError> {
    EnvFilter::try_new(directives).map_err(|source| TracingError::Filter {
        filter: directives.to_string(),
        source,
    })
}

/// Install the global tracing subscriber.
///
/// Always installs a `fmt` layer writing to stderr with span close timing.
/// With `enable_otel`, lifecycle spans are also exported through an
/// OpenTelemetry stdout exporter.
///
/// # Errors
///
/// Fails when the filter directives do not parse or a global subscriber is
/// already installed.
pub fn init_tracing(enable_otel: bool, fallback_filter: &str) -> Result<(), TracingError> {
    let filter = env_filter(fallback_filter)?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if !enable_otel {
        registry.try_init()?;
        return Ok(());
    }

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME));

    registry.with(otel_layer).try_init()?;
    let _ = TRACER_PROVIDER.set(provider.clone());
    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

/// Flush and shut down the OpenTelemetry provider, if one was installed.
pub fn shutdown_tracing() {
    let Some(provider) = TRACER_PROVIDER.get() else {
        return;
    };
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "tracer provider shutdown failed");
    }
}
