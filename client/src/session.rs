//! Session manager: connection, header maps and lifecycle.

use crate::classify;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, ErrorContext, ErrorKind};
use crate::token::{BearerToken, TokenSource};
use crate::validate::{validate_server_name, validate_url};
use platform_common::{ConnectionConfig, build_connection};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Header maps and the token they carry.
#[derive(Debug)]
struct HeaderState {
    json: HeaderMap,
    text: HeaderMap,
    token: Option<BearerToken>,
}

impl HeaderState {
    fn new(api_key: Option<&SecretString>, context: &ErrorContext) -> ClientResult<Self> {
        let mut json = HeaderMap::new();
        json.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut text = HeaderMap::new();
        text.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        if let Some(key) = api_key {
            let value = sensitive_header(key.expose_secret(), "api_key", context)?;
            json.insert(API_KEY, value.clone());
            text.insert(API_KEY, value);
        }

        Ok(Self {
            json,
            text,
            token: None,
        })
    }
}

fn sensitive_header(value: &str, field: &str, context: &ErrorContext) -> ClientResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|_| {
        ClientError::invalid_parameter(
            format!("{field} contains characters not allowed in a header"),
            context.clone().with_info("field", field),
        )
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Check a token supplied through the configuration the way
/// `set_bearer_token` would, before anything touches the network.
fn preset_token(
    token: SecretString,
    source: TokenSource,
    owner: &str,
    context: &ErrorContext,
) -> ClientResult<BearerToken> {
    if token.expose_secret().trim().is_empty() {
        return Err(ClientError::invalid_parameter(
            "token must not be empty",
            context.clone().with_info("field", "token"),
        ));
    }
    let token = BearerToken::new(token, source, owner);
    sensitive_header(&token.authorization_value(), "token", context)?;
    Ok(token)
}

/// An authenticated session against one server on a platform.
///
/// Opened with a connectivity probe; closed explicitly or on drop. The
/// async methods here are the primary API, see
/// [`BlockingClientSession`](crate::BlockingClientSession) for the
/// blocking form.
#[derive(Debug)]
pub struct ClientSession {
    server_name: String,
    platform_url: String,
    user_id: String,
    user_pwd: Option<SecretString>,
    page_size: u32,
    timeout: Duration,
    log_payloads: bool,
    headers: RwLock<HeaderState>,
    connection: RwLock<Option<Client>>,
}

impl ClientSession {
    /// Validate the configuration, open the connection and probe the
    /// platform.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a malformed server name, platform URL, preset
    /// token or API key (no network call is made); `Connection` when the
    /// probe fails.
    #[instrument(skip(config), fields(server = %config.server_name, platform = %config.platform_url))]
    pub async fn open(config: ClientConfig) -> ClientResult<Self> {
        let context =
            ErrorContext::new("open", &config.platform_url).with_user_id(&config.user_id);
        validate_server_name(&config.server_name, &context)?;
        validate_url(&config.platform_url, &context)?;
        let preset = config
            .token
            .map(|token| preset_token(token, config.token_source, &config.user_id, &context))
            .transpose()?;

        let connection = ConnectionConfig::default()
            .with_connect_timeout(config.connect_timeout)
            .with_tls(config.verify_tls);
        let http = build_connection(&connection).map_err(|e| {
            ClientError::unknown("failed to build HTTP connection", context.clone(), Some(e))
        })?;

        let session = Self {
            server_name: config.server_name.trim().to_string(),
            platform_url: config.platform_url.trim().trim_end_matches('/').to_string(),
            user_id: config.user_id,
            user_pwd: config.user_pwd,
            page_size: config.page_size,
            timeout: config.timeout,
            log_payloads: config.log_payloads,
            headers: RwLock::new(HeaderState::new(config.api_key.as_ref(), &context)?),
            connection: RwLock::new(Some(http)),
        };

        session.probe(config.probe_timeout).await?;

        if let Some(token) = preset {
            session.install_token(token, &context)?;
        }

        info!(verify_tls = config.verify_tls, "Session opened");
        Ok(session)
    }

    async fn probe(&self, timeout: Duration) -> ClientResult<()> {
        match self.fetch_about("probe", timeout).await {
            Ok(_) => {
                debug!("Connectivity probe succeeded");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::Connection => {
                warn!(error = %err, "Connectivity probe failed");
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "Connectivity probe failed");
                Err(ClientError::connection(
                    format!("connectivity probe failed: {err}"),
                    err.context().clone(),
                    None,
                ))
            }
        }
    }

    /// Text of the platform's `/api/about` endpoint.
    ///
    /// # Errors
    ///
    /// The classified transport failure.
    #[instrument(skip(self), fields(platform = %self.platform_url))]
    pub async fn platform_origin(&self) -> ClientResult<String> {
        self.fetch_about("platform_origin", self.timeout).await
    }

    async fn fetch_about(&self, operation: &str, timeout: Duration) -> ClientResult<String> {
        let endpoint = format!("{}/api/about", self.platform_url);
        let context = ErrorContext::new(operation, &endpoint)
            .with_method("GET")
            .with_user_id(&self.user_id);
        let http = self.connection(&context)?;

        let response = http
            .get(&endpoint)
            .headers(self.headers(false))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify::transport(e, timeout, &context))?;

        let status = response.status();
        if !classify::is_transport_success(status) {
            return Err(classify::rejection(status, response.text().await, &context));
        }
        response
            .text()
            .await
            .map_err(|e| classify::transport(e, timeout, &context))
    }

    /// Release the connection. Idempotent and infallible.
    pub fn close(&self) {
        let released = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            info!(server = %self.server_name, "Session closed");
        }
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Server this session addresses.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Platform root URL without a trailing slash.
    #[must_use]
    pub fn platform_url(&self) -> &str {
        &self.platform_url
    }

    /// User this session acts for.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Default page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Default per-call timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// `{platformURL}/servers/{serverName}`
    #[must_use]
    pub fn server_root(&self) -> String {
        format!("{}/servers/{}", self.platform_url, self.server_name)
    }

    /// `{platformURL}/servers/{serverName}/api/open-metadata`
    #[must_use]
    pub fn base_path(&self) -> String {
        format!("{}/api/open-metadata", self.server_root())
    }

    /// `startFrom`/`pageSize` query parameters, defaulting to the session
    /// page size.
    #[must_use]
    pub fn paging_query(&self, start_from: u32, page_size: Option<u32>) -> Vec<(String, String)> {
        vec![
            ("startFrom".to_string(), start_from.to_string()),
            (
                "pageSize".to_string(),
                page_size.unwrap_or(self.page_size).to_string(),
            ),
        ]
    }

    /// Source of the installed token, if any.
    #[must_use]
    pub fn token_source(&self) -> Option<TokenSource> {
        self.read_headers().token.as_ref().map(BearerToken::source)
    }

    pub(crate) fn password(&self) -> Option<&SecretString> {
        self.user_pwd.as_ref()
    }

    pub(crate) const fn log_payloads(&self) -> bool {
        self.log_payloads
    }

    pub(crate) fn connection(&self, context: &ErrorContext) -> ClientResult<Client> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ClientError::connection("session is closed", context.clone(), None))
    }

    /// Snapshot of the JSON or text header map.
    pub(crate) fn headers(&self, is_json: bool) -> HeaderMap {
        let state = self.read_headers();
        if is_json {
            state.json.clone()
        } else {
            state.text.clone()
        }
    }

    pub(crate) fn authorization(&self) -> Option<String> {
        self.read_headers()
            .json
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub(crate) fn install_token(
        &self,
        token: BearerToken,
        context: &ErrorContext,
    ) -> ClientResult<()> {
        let value = sensitive_header(&token.authorization_value(), "token", context)?;
        let mut state = self.headers.write().unwrap_or_else(PoisonError::into_inner);
        state.json.insert(AUTHORIZATION, value.clone());
        state.text.insert(AUTHORIZATION, value);
        state.token = Some(token);
        Ok(())
    }

    fn read_headers(&self) -> std::sync::RwLockReadGuard<'_, HeaderState> {
        self.headers.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}
