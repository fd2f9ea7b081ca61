//! Classified client errors using thiserror 2.0.
//!
//! Every failure leaving the client core is one of six kinds and carries an
//! [`ErrorContext`] describing the call that produced it, so callers never
//! have to re-derive the endpoint, operation or HTTP status.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Closed set of error kinds raised by the client core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed caller input or an unusable server answer
    InvalidParameter,
    /// Transport connect failure
    Connection,
    /// Transport call exceeded its timeout
    Timeout,
    /// Transport succeeded but the embedded `relatedHTTPCode` was not 200
    ApiError,
    /// Transport status outside 200/201
    ClientRejected,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Stable name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid-parameter",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::ApiError => "api-error",
            Self::ClientRejected => "client-rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and for whom a failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Calling operation, e.g. `create_bearer_token`
    pub operation: String,
    /// Endpoint URL (or platform URL for session-level failures)
    pub endpoint: String,
    /// HTTP method, when a request was being made
    pub http_method: Option<String>,
    /// Transport status, when a response arrived
    pub http_status: Option<u16>,
    /// User the session acts for
    pub user_id: Option<String>,
    /// Free-form details
    pub additional_info: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create a context for an operation against an endpoint.
    #[must_use]
    pub fn new(operation: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Record the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.http_method = Some(method.into());
        self
    }

    /// Record the transport status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Record the acting user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a free-form detail.
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation={}", self.operation)?;
        if let Some(method) = &self.http_method {
            write!(f, " method={method}")?;
        }
        write!(f, " endpoint={}", self.endpoint)?;
        if let Some(status) = self.http_status {
            write!(f, " status={status}")?;
        }
        Ok(())
    }
}

/// Errors raised by the client core.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Malformed input, empty login token, or undecodable JSON
    #[error("Invalid parameter: {message} ({context})")]
    InvalidParameter {
        /// What was wrong
        message: String,
        /// Call context
        context: Box<ErrorContext>,
        /// JSON decode failure, when that was the trigger
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Transport connect failure (DNS, refused, unreachable) or a closed session
    #[error("Connection failed: {message} ({context})")]
    Connection {
        /// What failed
        message: String,
        /// Call context
        context: Box<ErrorContext>,
        /// Transport error
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Call exceeded its configured timeout.
    ///
    /// `timeout` is the per-request limit. A timeout while connecting is
    /// bounded by the connect timeout instead and carries `phase=connect`
    /// in the context's `additional_info`.
    #[error("Request timed out after {}s ({context})", .timeout.as_secs_f64())]
    Timeout {
        /// Configured timeout of the call
        timeout: Duration,
        /// Call context
        context: Box<ErrorContext>,
        /// Transport error
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Transport succeeded but `relatedHTTPCode` was not 200
    #[error("Platform reported relatedHTTPCode {} ({context})", display_code(.related_http_code))]
    ApiError {
        /// Embedded application status, if the body carried one
        related_http_code: Option<i64>,
        /// Parsed response body
        body: serde_json::Value,
        /// Call context
        context: Box<ErrorContext>,
    },

    /// Transport status outside 200/201
    #[error("Request rejected with HTTP {status} ({context})")]
    ClientRejected {
        /// Transport status
        status: u16,
        /// Raw response text
        response_text: String,
        /// Call context
        context: Box<ErrorContext>,
    },

    /// Any other unexpected failure
    #[error("Unexpected failure: {message} ({context})")]
    Unknown {
        /// What failed
        message: String,
        /// Call context
        context: Box<ErrorContext>,
        /// Transport error, when there was one
        #[source]
        source: Option<reqwest::Error>,
    },
}

fn display_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "<missing>".to_string(), |c| c.to_string())
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ApiError { .. } => ErrorKind::ApiError,
            Self::ClientRejected { .. } => ErrorKind::ClientRejected,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Context of the failed call.
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidParameter { context, .. }
            | Self::Connection { context, .. }
            | Self::Timeout { context, .. }
            | Self::ApiError { context, .. }
            | Self::ClientRejected { context, .. }
            | Self::Unknown { context, .. } => context,
        }
    }

    /// Transport status, if a response arrived.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ClientRejected { status, .. } => Some(*status),
            _ => self.context().http_status,
        }
    }

    /// Whether a caller could reasonably retry. The core itself never does.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            context: Box::new(context),
            source: None,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(
        message: impl Into<String>,
        context: ErrorContext,
        source: Option<reqwest::Error>,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            context: Box::new(context),
            source,
        }
    }

    /// Create an unknown error.
    #[must_use]
    pub fn unknown(
        message: impl Into<String>,
        context: ErrorContext,
        source: Option<reqwest::Error>,
    ) -> Self {
        Self::Unknown {
            message: message.into(),
            context: Box::new(context),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ErrorContext {
        ErrorContext::new("get_asset", "https://localhost:9443/servers/view/api/open-metadata/x")
            .with_method("GET")
            .with_user_id("erinoverview")
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::invalid_parameter("server name is empty", ctx());
        let text = err.to_string();
        assert!(text.starts_with("Invalid parameter: server name is empty"));
        assert!(text.contains("operation=get_asset"));
        assert!(text.contains("method=GET"));
    }

    #[test]
    fn test_timeout_display_carries_seconds() {
        let err = ClientError::Timeout {
            timeout: Duration::from_secs(30),
            context: Box::new(ctx()),
            source: None,
        };
        assert!(err.to_string().contains("after 30s"));
    }

    #[test]
    fn test_api_error_missing_code() {
        let err = ClientError::ApiError {
            related_http_code: None,
            body: serde_json::json!({}),
            context: Box::new(ctx().with_status(200)),
        };
        assert!(err.to_string().contains("<missing>"));
        assert_eq!(err.http_status(), Some(200));
    }

    #[test]
    fn test_kinds_and_retryability() {
        let conn = ClientError::connection("refused", ctx(), None);
        assert_eq!(conn.kind(), ErrorKind::Connection);
        assert!(conn.is_retryable());

        let rejected = ClientError::ClientRejected {
            status: 404,
            response_text: "not found".to_string(),
            context: Box::new(ctx()),
        };
        assert_eq!(rejected.kind(), ErrorKind::ClientRejected);
        assert_eq!(rejected.http_status(), Some(404));
        assert!(!rejected.is_retryable());

        assert!(!ClientError::unknown("boom", ctx(), None).is_retryable());
    }

    #[test]
    fn test_context_accessor() {
        let err = ClientError::invalid_parameter("bad", ctx().with_info("field", "guid"));
        assert_eq!(err.context().operation, "get_asset");
        assert_eq!(err.context().user_id.as_deref(), Some("erinoverview"));
        assert_eq!(err.context().additional_info.get("field").map(String::as_str), Some("guid"));
    }
}
