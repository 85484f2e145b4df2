use std::env;

use tracing::{dispatcher, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const FILTER_KEY: &str = "RUST_LOG";
const SERVICE_NAME_KEY: &str = "OTEL_SERVICE_NAME";

/// Maps a counted `--debug` flag onto a tracing level.
///
/// INFO is the floor: the credential report of a bootstrap run is emitted
/// at that level.
pub fn level_of(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber, unless one has been set already.
///
/// Without `--debug` an existing `RUST_LOG` filter is honored; any
/// `--debug` overrides it. With `export`, spans and metrics are also shipped
/// over OTLP when the corresponding features are enabled.
pub fn init_once(verbosity: u8, export: bool) {
    if dispatcher::has_been_set() {
        return;
    }

    let level = level_of(verbosity);
    let filter = match env::var(FILTER_KEY) {
        Ok(directives) if verbosity == 0 && !directives.is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
        }
        _ => EnvFilter::new(level.as_str()),
    };

    if env::var_os(SERVICE_NAME_KEY).is_none() {
        env::set_var(SERVICE_NAME_KEY, env!("CARGO_CRATE_NAME"));
    }

    let registry = Registry::default()
        .with(filter)
        .with(::tracing_subscriber::fmt::layer());

    #[cfg(feature = "metrics")]
    let registry = registry.with(export.then(otlp::metrics_layer));
    #[cfg(feature = "trace")]
    let registry = registry.with(export.then(otlp::trace_layer));
    #[cfg(not(feature = "otlp"))]
    let _ = export;

    registry.init()
}

/// Flushes the pending spans of the exporters, if any.
pub fn shutdown() {
    ::opentelemetry::global::shutdown_tracer_provider()
}

#[cfg(feature = "otlp")]
mod otlp {
    use opentelemetry_otlp::{new_exporter, new_pipeline, TonicExporterBuilder};
    use opentelemetry_sdk::runtime::TokioCurrentThread as Runtime;
    use tracing::Subscriber;
    use tracing_subscriber::{registry::LookupSpan, Layer};

    fn exporter() -> TonicExporterBuilder {
        new_exporter().tonic()
    }

    #[cfg(feature = "metrics")]
    pub(super) fn metrics_layer<S>() -> impl Layer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        new_pipeline()
            .metrics(Runtime)
            .with_exporter(exporter())
            .build()
            .map(::tracing_opentelemetry::MetricsLayer::new)
            .expect("failed to init a metrics")
    }

    #[cfg(feature = "trace")]
    pub(super) fn trace_layer<S>() -> impl Layer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        new_pipeline()
            .tracing()
            .with_exporter(exporter())
            .install_batch(Runtime)
            .map(::tracing_opentelemetry::OpenTelemetryLayer::new)
            .expect("failed to init a tracer")
    }
}
