//! Provides utilities to initialize logging and OpenTelemetry tracing.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable name for the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "BTC_PEG_OTLP_URL";

/// Environment variable name for the service label, which is appended to the
/// whoami string.
pub const SVC_LABEL_ENVVAR: &str = "BTC_PEG_SVC_LABEL";

/// Environment variable that enables file names in log lines when set to `1`.
pub const LOG_FILE_ENVVAR: &str = "BTC_PEG_LOG_FILE";

/// Environment variable that enables line numbers in log lines when set to `1`.
pub const LOG_LINE_NUM_ENVVAR: &str = "BTC_PEG_LOG_LINE_NUM";

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP exporter could not be built.
    #[error("could not build otlp exporter: {0}")]
    Exporter(String),

    /// A global subscriber is already installed.
    #[error("could not install subscriber: {0}")]
    AlreadyInitialized(String),
}

/// Configuration for the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// The OpenTelemetry URL for exporting traces.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new empty instance with whoami set.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    /// Creates a new instance with the whoami string set to the provided
    /// string.
    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Creates a new instance from the base name and the standard envvars.
    pub fn from_env(base: &str) -> Self {
        let mut config = Self::with_base_name(base);
        if let Some(url) = get_otlp_url_from_env() {
            config.set_otlp_url(url);
        }

        config
    }

    /// Sets the opentelemetry URL to the provided string.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    /// The whoami string.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(btc-peg)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// # Panics
///
/// If a global subscriber is already installed or the exporter cannot be built.
pub fn init(config: LoggerConfig) {
    try_init(config).expect("must be able to initialize logging");
}

/// Initializes the logging subsystem, reporting failures instead of panicking.
pub fn try_init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filt = tracing_subscriber::EnvFilter::from_default_env();

    let log_file = env::var(LOG_FILE_ENVVAR).is_ok_and(|v| v == "1");
    let log_line_num = env::var(LOG_LINE_NUM_ENVVAR).is_ok_and(|v| v == "1");

    // Stdout logging.
    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(log_file)
                .with_line_number(log_line_num),
        )
        .with_filter(filt);

    // OpenTelemetry output.
    if let Some(otel_url) = &config.otel_url {
        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
            .build();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otel_url)
            .build()
            .map_err(|e| LoggingError::Exporter(e.to_string()))?;

        let tp = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();

        let tracer = tp.tracer("btc-peg");

        let otel_sub = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(stdout_sub)
            .with(otel_sub)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(stdout_sub)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    }

    info!(whoami = %config.whoami, "logging started");

    Ok(())
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_reported() {
        // the first call may race with other tests in this binary, the second never succeeds
        let _ = try_init(LoggerConfig::new("first".to_string()));

        assert!(matches!(
            try_init(LoggerConfig::new("second".to_string())),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn explicit_otlp_url_is_kept() {
        let mut config = LoggerConfig::new("witness".to_string());
        config.set_otlp_url("http://localhost:4317".to_string());

        assert_eq!(config.whoami(), "witness");
        assert_eq!(config.otel_url.as_deref(), Some("http://localhost:4317"));
    }
}
