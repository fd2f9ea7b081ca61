//! Bearer token lifecycle: login, refresh, direct installation.
//!
//! The session's header maps are the only state a token touches. Requests
//! snapshot the headers when they start, so a refresh racing with in-flight
//! calls leaves those calls on the previous token.

use crate::classify;
use crate::error::{ClientError, ClientResult, ErrorContext};
use crate::session::ClientSession;
use crate::validate::validate_user_id;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use tracing::{info, instrument, warn};

/// Where a bearer token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenSource {
    /// Issued by the platform's login endpoint; refreshable with the
    /// session's stored credentials
    PlatformIssued,
    /// Handed to the session by the caller; never refreshed
    #[default]
    ExternallySupplied,
}

impl TokenSource {
    /// Stable name of the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlatformIssued => "platform-issued",
            Self::ExternallySupplied => "externally-supplied",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An installed bearer token.
#[derive(Debug, Clone)]
pub struct BearerToken {
    value: SecretString,
    source: TokenSource,
    owner_user_id: String,
}

impl BearerToken {
    /// Create a token record.
    #[must_use]
    pub fn new(value: SecretString, source: TokenSource, owner_user_id: impl Into<String>) -> Self {
        Self {
            value,
            source,
            owner_user_id: owner_user_id.into(),
        }
    }

    /// Where the token came from.
    #[must_use]
    pub const fn source(&self) -> TokenSource {
        self.source
    }

    /// User the token was issued for.
    #[must_use]
    pub fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    /// The bare token.
    #[must_use]
    pub const fn value(&self) -> &SecretString {
        &self.value
    }

    pub(crate) fn authorization_value(&self) -> String {
        format!("Bearer {}", self.value.expose_secret())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

impl ClientSession {
    /// Log in and install a platform-issued token.
    ///
    /// Missing arguments fall back to the session's stored credentials.
    /// The login endpoint answers with the raw token text.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the credentials are missing or the platform
    /// returns an empty token; otherwise the classified transport failure.
    #[instrument(skip(self, password), fields(server = %self.server_name()))]
    pub async fn create_bearer_token(
        &self,
        user_id: Option<&str>,
        password: Option<&SecretString>,
    ) -> ClientResult<SecretString> {
        let endpoint = format!("{}/api/token", self.server_root());
        let user_id = user_id.unwrap_or_else(|| self.user_id());
        let context = ErrorContext::new("create_bearer_token", &endpoint)
            .with_method("POST")
            .with_user_id(user_id);

        validate_user_id(user_id, &context)?;
        let password = password.or(self.password()).ok_or_else(|| {
            ClientError::invalid_parameter("no password available for login", context.clone())
        })?;
        if password.expose_secret().trim().is_empty() {
            return Err(ClientError::invalid_parameter(
                "password must not be empty",
                context,
            ));
        }

        let http = self.connection(&context)?;
        let mut headers = self.headers(true);
        headers.remove(AUTHORIZATION);
        let body = LoginRequest {
            user_id,
            password: password.expose_secret(),
        };

        let response = http
            .post(&endpoint)
            .headers(headers)
            .json(&body)
            .timeout(self.default_timeout())
            .send()
            .await
            .map_err(|e| classify::transport(e, self.default_timeout(), &context))?;

        let status = response.status();
        if !classify::is_transport_success(status) {
            return Err(classify::rejection(status, response.text().await, &context));
        }

        let token = response
            .text()
            .await
            .map_err(|e| classify::transport(e, self.default_timeout(), &context))?;
        if token.trim().is_empty() {
            warn!(user_id, "Login succeeded but returned an empty token");
            return Err(ClientError::invalid_parameter(
                "platform returned an empty token",
                context.with_status(status.as_u16()),
            ));
        }

        let token = SecretString::from(token);
        self.install_token(
            BearerToken::new(token.clone(), TokenSource::PlatformIssued, user_id),
            &context,
        )?;
        info!(user_id, "Platform-issued bearer token installed");
        Ok(token)
    }

    /// Obtain a fresh platform-issued token with the stored credentials.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` ("invalid token source") unless the installed
    /// token is platform-issued and the stored user id and password are
    /// valid; otherwise whatever [`create_bearer_token`](Self::create_bearer_token) raises.
    #[instrument(skip(self), fields(server = %self.server_name()))]
    pub async fn refresh_bearer_token(&self) -> ClientResult<SecretString> {
        let context = ErrorContext::new("refresh_bearer_token", self.server_root())
            .with_user_id(self.user_id());

        let refreshable = self.token_source() == Some(TokenSource::PlatformIssued)
            && validate_user_id(self.user_id(), &context).is_ok()
            && self
                .password()
                .is_some_and(|p| !p.expose_secret().trim().is_empty());

        if !refreshable {
            return Err(ClientError::invalid_parameter(
                "invalid token source",
                context.with_info(
                    "token_source",
                    self.token_source().map_or("none", TokenSource::as_str),
                ),
            ));
        }

        self.create_bearer_token(None, None).await
    }

    /// Install a caller-supplied token without contacting the platform.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty token or one that cannot be sent as
    /// a header value.
    pub fn set_bearer_token(&self, token: &str) -> ClientResult<()> {
        let context = ErrorContext::new("set_bearer_token", self.server_root())
            .with_user_id(self.user_id());
        if token.trim().is_empty() {
            return Err(ClientError::invalid_parameter(
                "token must not be empty",
                context,
            ));
        }

        self.install_token(
            BearerToken::new(
                SecretString::from(token),
                TokenSource::ExternallySupplied,
                self.user_id(),
            ),
            &context,
        )?;
        info!("Externally supplied bearer token installed");
        Ok(())
    }

    /// The installed `Authorization` header value, i.e. `"Bearer {token}"`,
    /// not the bare token. `None` until a token is installed.
    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.authorization()
    }
}
