//! Tracer setup and management

use bridge_core::{Error, LoggingConfig, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Span processor builders registered before initialization
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Register a span processor (and with it an exporter) for the tracer provider.
///
/// Must be called before [`init_telemetry`]. Without any registered
/// processor, spans stay local to the `tracing` subscriber and are never
/// exported. Returns `false` when telemetry is already initialized.
pub fn register_span_processor(builder: ProcessorBuilder) -> bool {
    let mut builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    match builders.as_mut() {
        Some(pending) => {
            pending.push(builder);
            true
        }
        None => {
            tracing::warn!("Attempted to register span processor after telemetry initialization");
            false
        }
    }
}

/// Initialize logging and tracing.
///
/// This sets up:
/// - A tracer provider with any registered span processors, bridged into
///   `tracing` through an OpenTelemetry layer
/// - Structured log output to stderr, or appended to `config.file`
/// - Filtering from `RUST_LOG` when set, otherwise `config.level`
///
/// Returns `false` when telemetry was already initialized.
///
/// # Example
///
/// ```rust,no_run
/// use bridge_core::LoggingConfig;
/// use bridge_telemetry::init_telemetry;
///
/// init_telemetry(&LoggingConfig::default()).expect("telemetry");
/// ```
pub fn init_telemetry(config: &LoggingConfig) -> Result<bool> {
    if TRACER_PROVIDER.get().is_some() {
        return Ok(false);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            Error::config_error(format!("Invalid log level '{}': {}", config.level, e))
        })?;

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::config_error(format!("Cannot open log file {:?}: {}", path, e))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
        .unwrap_or_default();
    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();
    let tracer = tracer_provider.tracer(crate::attributes::SYSTEM_NAME);

    // Lost race with a concurrent initializer
    if TRACER_PROVIDER.set(Arc::new(tracer_provider)).is_err() {
        return Ok(false);
    }

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_line_number(true);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(telemetry_layer);

    let installed = if config.json {
        registry.with(fmt_layer.json()).try_init()
    } else {
        registry.with(fmt_layer).try_init()
    };

    Ok(installed.is_ok())
}

/// Flush spans held by the registered processors, typically before exit.
pub fn flush_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        for result in provider.force_flush() {
            if let Err(e) = result {
                tracing::warn!("Failed to flush spans: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_to_file_then_second_call_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file: Some(dir.path().join("openbridge.log")),
            ..LoggingConfig::default()
        };

        let _ = init_telemetry(&config).unwrap();
        assert!(TRACER_PROVIDER.get().is_some());
        assert!(!init_telemetry(&config).unwrap());

        let late = register_span_processor(Box::new(|| -> SimpleSpanProcessor {
            unreachable!("builders are consumed at initialization")
        }));
        assert!(!late);
        flush_telemetry();
    }
}
