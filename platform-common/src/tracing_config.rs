//! Subscriber setup for binaries and test harnesses.
//!
//! Library code only emits `tracing` events. Whoever owns the process calls
//! [`init_tracing`] once to decide the filter and the output format.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Recorded on the startup event
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `open_metadata_client=debug`
    pub default_directive: String,
    /// Output format
    pub format: LogFormat,
    /// Route output through the test harness capture
    pub test_writer: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "open-metadata-client".to_string(),
            default_directive: "info".to_string(),
            format: LogFormat::Pretty,
            test_writer: false,
        }
    }
}

impl TracingConfig {
    /// Name recorded on the startup event.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Fallback filter directive.
    #[must_use]
    pub fn with_log_level(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Emit JSON.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Write through the libtest capture so output shows only for failures.
    #[must_use]
    pub const fn for_tests(mut self) -> Self {
        self.test_writer = true;
        self
    }

    /// Filter from `RUST_LOG`, else from the default directive, else `info`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_directive))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed; the call then changes
/// nothing, so harnesses may call it from every test.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match (config.format, config.test_writer) {
        (LogFormat::Pretty, false) => registry.with(fmt::layer()).try_init(),
        (LogFormat::Pretty, true) => registry.with(fmt::layer().with_test_writer()).try_init(),
        (LogFormat::Json, false) => registry.with(fmt::layer().json()).try_init(),
        (LogFormat::Json, true) => registry
            .with(fmt::layer().json().with_test_writer())
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::debug!(service = %config.service_name, format = ?config.format, "Tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TracingConfig::default();
        assert_eq!(config.default_directive, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.test_writer);
    }

    #[test]
    fn test_builders() {
        let config = TracingConfig::default()
            .with_service_name("glossary-client")
            .with_log_level("open_metadata_client=debug")
            .with_json_output()
            .for_tests();
        assert_eq!(config.service_name, "glossary-client");
        assert_eq!(config.default_directive, "open_metadata_client=debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.test_writer);
    }

    #[test]
    fn test_bad_directive_falls_back() {
        let config = TracingConfig::default().with_log_level("[[not a directive");
        let _ = config.filter();
    }

    #[test]
    fn test_second_init_is_noop() {
        let config = TracingConfig::default().with_log_level("warn").for_tests();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
