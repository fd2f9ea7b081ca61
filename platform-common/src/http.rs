//! Connection building shared by every resource client.
//!
//! One place decides TLS verification and pooling, so all clients of a
//! platform behave alike. Request timeouts are not set here: callers pass
//! one per request, because bulk and archive calls outlive the default.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// How the platform's certificate chain is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Verify against the built-in roots
    #[default]
    Verify,
    /// Accept any certificate, for self-signed development platforms
    AcceptInvalid,
}

impl From<bool> for TlsMode {
    fn from(verify: bool) -> Self {
        if verify { Self::Verify } else { Self::AcceptInvalid }
    }
}

/// Settings for one platform connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept
    pub idle_timeout: Duration,
    /// Idle connections kept per host
    pub max_idle_per_host: usize,
    /// TCP keepalive interval; `None` leaves the OS default
    pub keepalive: Option<Duration>,
    /// Sent as `User-Agent`
    pub user_agent: String,
    /// Certificate handling
    pub tls: TlsMode,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 8,
            keepalive: Some(Duration::from_secs(60)),
            user_agent: format!("open-metadata-rust/{}", env!("CARGO_PKG_VERSION")),
            tls: TlsMode::Verify,
        }
    }
}

impl ConnectionConfig {
    /// Connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Certificate handling; `true` verifies.
    #[must_use]
    pub fn with_tls(mut self, tls: impl Into<TlsMode>) -> Self {
        self.tls = tls.into();
        self
    }

    /// User agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Pool size and idle lifetime.
    #[must_use]
    pub const fn with_pool(mut self, max_idle_per_host: usize, idle_timeout: Duration) -> Self {
        self.max_idle_per_host = max_idle_per_host;
        self.idle_timeout = idle_timeout;
        self
    }
}

/// Build a pooled rustls connection from `config`.
///
/// # Errors
///
/// Returns the reqwest error when the TLS backend cannot initialise.
///
/// # Examples
///
/// ```
/// use platform_common::{ConnectionConfig, build_connection};
///
/// let dev = ConnectionConfig::default().with_tls(false);
/// assert!(build_connection(&dev).is_ok());
/// ```
pub fn build_connection(config: &ConnectionConfig) -> Result<Client, reqwest::Error> {
    let builder = ClientBuilder::new()
        .use_rustls_tls()
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.idle_timeout)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .tcp_keepalive(config.keepalive)
        .user_agent(config.user_agent.as_str());

    match config.tls {
        TlsMode::Verify => builder,
        TlsMode::AcceptInvalid => builder.danger_accept_invalid_certs(true),
    }
    .build()
}
