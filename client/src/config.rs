//! Client session configuration.

use crate::error::{ClientError, ClientResult, ErrorContext};
use crate::token::TokenSource;
use secrecy::SecretString;
use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for bulk uploads and large searches.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for archive loads.
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(240);
/// Default page size for paged queries.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const ENV_PLATFORM_URL: &str = "OPEN_METADATA_PLATFORM_URL";
const ENV_SERVER_NAME: &str = "OPEN_METADATA_SERVER_NAME";
const ENV_USER_ID: &str = "OPEN_METADATA_USER_ID";
const ENV_USER_PWD: &str = "OPEN_METADATA_USER_PWD";
const ENV_API_KEY: &str = "OPEN_METADATA_API_KEY";
const ENV_VERIFY_TLS: &str = "OPEN_METADATA_VERIFY_TLS";
const ENV_PAGE_SIZE: &str = "OPEN_METADATA_PAGE_SIZE";

/// Everything needed to open a [`ClientSession`](crate::ClientSession).
///
/// Immutable once handed to `open`; two sessions never share settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Platform root URL, e.g. `https://localhost:9443`
    pub platform_url: String,
    /// Server the session addresses
    pub server_name: String,
    /// User the session acts for
    pub user_id: String,
    /// Password used to obtain platform-issued tokens
    pub user_pwd: Option<SecretString>,
    /// Bearer token supplied up front
    pub token: Option<SecretString>,
    /// Recorded source of `token`
    pub token_source: TokenSource,
    /// Sent as `X-Api-Key` when present
    pub api_key: Option<SecretString>,
    /// Default page size for paged queries
    pub page_size: u32,
    /// Verify the platform's TLS certificate
    pub verify_tls: bool,
    /// Default per-call timeout
    pub timeout: Duration,
    /// Timeout of the connectivity probe run by `open`
    pub probe_timeout: Duration,
    /// Transport connect timeout
    pub connect_timeout: Duration,
    /// Log request and response bodies at debug level
    pub log_payloads: bool,
}

impl ClientConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        platform_url: impl Into<String>,
        server_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            platform_url: platform_url.into(),
            server_name: server_name.into(),
            user_id: user_id.into(),
            user_pwd: None,
            token: None,
            token_source: TokenSource::ExternallySupplied,
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            log_payloads: false,
        }
    }

    /// Read the configuration from `OPEN_METADATA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when the platform URL or server name is
    /// unset, or a numeric/boolean variable does not parse.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup, using the
    /// `OPEN_METADATA_*` variable names as keys.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let context = ErrorContext::new("from_env", "");
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                ClientError::invalid_parameter(
                    format!("{key} is not set"),
                    context.clone().with_info("variable", key),
                )
            })
        };

        let mut config = Self::new(
            required(ENV_PLATFORM_URL)?,
            required(ENV_SERVER_NAME)?,
            lookup(ENV_USER_ID).unwrap_or_default(),
        );
        config.user_pwd = lookup(ENV_USER_PWD).map(SecretString::from);
        config.api_key = lookup(ENV_API_KEY).map(SecretString::from);

        if let Some(raw) = lookup(ENV_VERIFY_TLS) {
            config.verify_tls = parse_flag(&raw).ok_or_else(|| {
                ClientError::invalid_parameter(
                    format!("{ENV_VERIFY_TLS}='{raw}' is not a boolean"),
                    context.clone().with_info("variable", ENV_VERIFY_TLS),
                )
            })?;
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.page_size = raw.trim().parse().map_err(|_| {
                ClientError::invalid_parameter(
                    format!("{ENV_PAGE_SIZE}='{raw}' is not a page size"),
                    context.clone().with_info("variable", ENV_PAGE_SIZE),
                )
            })?;
        }
        Ok(config)
    }

    /// Set the password used for platform-issued tokens.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.user_pwd = Some(SecretString::from(password.into()));
        self
    }

    /// Install a bearer token at open, recording where it came from.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, source: TokenSource) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self.token_source = source;
        self
    }

    /// Set the API key header.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Set the default page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enable or disable TLS verification.
    #[must_use]
    pub const fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Set the default per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connectivity probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the transport connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Log request and response bodies at debug level.
    #[must_use]
    pub const fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new("https://localhost:9443", "qs-view-server", "erinoverview");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.verify_tls);
        assert!(config.token.is_none());
        assert_eq!(config.token_source, TokenSource::ExternallySupplied);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("https://localhost:9443", "qs-view-server", "erinoverview")
            .with_password("secret")
            .with_token("abc", TokenSource::PlatformIssued)
            .with_verify_tls(false)
            .with_timeout(BULK_TIMEOUT)
            .with_page_size(25);

        assert_eq!(config.user_pwd.as_ref().map(|p| p.expose_secret()), Some("secret"));
        assert_eq!(config.token_source, TokenSource::PlatformIssued);
        assert!(!config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new("https://localhost:9443", "qs-view-server", "erinoverview")
            .with_password("hunter2-password")
            .with_api_key("api-key-value");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2-password"));
        assert!(!debug.contains("api-key-value"));
        assert!(debug.contains("erinoverview"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_PLATFORM_URL, "https://platform:9443"),
            (ENV_SERVER_NAME, "view-server"),
            (ENV_USER_ID, "peterprofile"),
            (ENV_VERIFY_TLS, "false"),
            (ENV_PAGE_SIZE, "50"),
        ]))
        .unwrap();

        assert_eq!(config.platform_url, "https://platform:9443");
        assert_eq!(config.server_name, "view-server");
        assert_eq!(config.user_id, "peterprofile");
        assert!(!config.verify_tls);
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_from_lookup_missing_or_malformed() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_SERVER_NAME, "view-server")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            err.context().additional_info.get("variable").map(String::as_str),
            Some(ENV_PLATFORM_URL)
        );

        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_PLATFORM_URL, "https://platform:9443"),
            (ENV_SERVER_NAME, "view-server"),
            (ENV_VERIFY_TLS, "maybe"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
