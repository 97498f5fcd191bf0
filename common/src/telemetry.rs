use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::{log::SetLoggerError, LogTracer};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

use crate::helper::error_chain_fmt;

/// Builds the `tracing` subscriber shared by the services: bunyan-formatted JSON lines.
///
/// # Arguments
/// - `name`: name of the service, written in every log record
/// - `fallback_env_filter`: filter directives used when `RUST_LOG` is not set (ex: "info")
/// - `sink`: where log records are written (`std::io::stdout`, or `std::io::sink` in tests)
///
/// The returned type is spelled `impl Subscriber` because the layered type depends on `Sink`.
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    Registry::default()
        .with(env_filter)
        // Keeps span fields so they are attached to the events recorded inside the span
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name, sink))
}

/// Installs `subscriber` as the process-wide default and routes `log` records to it.
///
/// Only the first call can succeed: any later call returns a `TelemetryError`.
pub fn init_tracing_subscriber(
    subscriber: impl Subscriber + Send + Sync,
) -> Result<(), TelemetryError> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}

#[derive(thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to redirect log records to tracing: {0}")]
    LogTracerError(#[from] SetLoggerError),
    #[error("Failed to set the global tracing subscriber: {0}")]
    SubscriberError(#[from] SetGlobalDefaultError),
}

impl std::fmt::Debug for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
