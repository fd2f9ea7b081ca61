//! Request and response types for the executor.

use crate::error::ErrorContext;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_OPERATION: &str = "execute";

/// HTTP verbs the executor supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST` with the payload dispatched by type
    Post,
    /// `POST` with the payload always sent as an opaque body
    PostData,
    /// `DELETE`, optionally with a filter/reason payload
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post | Self::PostData => "POST",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post | Self::PostData => reqwest::Method::POST,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body, chosen at the call site.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Headers only
    #[default]
    None,
    /// JSON-encoded mapping
    Json(Map<String, Value>),
    /// Sent verbatim
    Raw(Vec<u8>),
}

impl Payload {
    /// JSON payload with nulls and empty objects stripped, see [`slim_body`].
    #[must_use]
    pub fn slim_json(body: Map<String, Value>) -> Self {
        Self::Json(slim_body(body))
    }

    /// Whether there is no body.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(body: Map<String, Value>) -> Self {
        Self::Json(body)
    }
}

impl From<String> for Payload {
    fn from(body: String) -> Self {
        Self::Raw(body.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(body: &str) -> Self {
        Self::Raw(body.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(body: Vec<u8>) -> Self {
        Self::Raw(body)
    }
}

/// Remove `null` values and objects left empty, recursively.
///
/// Arrays keep their length; only objects nested in them are slimmed.
#[must_use]
pub fn slim_body(body: Map<String, Value>) -> Map<String, Value> {
    body.into_iter()
        .filter_map(|(key, value)| slim_value(value).map(|v| (key, v)))
        .collect()
}

fn slim_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let slimmed = slim_body(map);
            (!slimmed.is_empty()).then_some(Value::Object(slimmed))
        }
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(slim_body(map)),
                    other => other,
                })
                .collect(),
        )),
        other => Some(other),
    }
}

/// One logical call for [`ClientSession::execute`](crate::ClientSession::execute).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) method: HttpMethod,
    pub(crate) endpoint: String,
    pub(crate) payload: Payload,
    pub(crate) timeout: Option<Duration>,
    pub(crate) is_json: bool,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) operation: Option<String>,
}

impl Request {
    /// Create a request expecting a JSON response.
    #[must_use]
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            payload: Payload::None,
            timeout: None,
            is_json: true,
            query: Vec::new(),
            operation: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    /// `POST` request sending an opaque body.
    #[must_use]
    pub fn post_data(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::PostData, endpoint)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    /// Attach a body.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Override the session's default timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return the raw response instead of checking and parsing JSON.
    #[must_use]
    pub const fn raw_response(mut self) -> Self {
        self.is_json = false;
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add several query parameters.
    #[must_use]
    pub fn with_query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Name the calling operation for error context.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Operation named for error context, `execute` when unnamed.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.operation.as_deref().unwrap_or(DEFAULT_OPERATION)
    }

    /// Endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Whether a JSON response is expected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.is_json
    }

    /// Build the per-call context, filling in the session's default timeout.
    #[must_use]
    pub fn context(&self, default_timeout: Duration) -> RequestContext {
        RequestContext {
            operation: self.operation_name().to_string(),
            endpoint: self.endpoint.clone(),
            http_method: self.method,
            timeout: self.timeout.unwrap_or(default_timeout),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Per-call details used to enrich errors and spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Calling operation
    pub operation: String,
    /// Endpoint URL
    pub endpoint: String,
    /// HTTP method
    pub http_method: HttpMethod,
    /// Effective timeout
    pub timeout: Duration,
    /// Correlates log lines of one call
    pub request_id: Uuid,
}

impl RequestContext {
    /// Error context for this call on behalf of `user_id`.
    #[must_use]
    pub fn error_context(&self, user_id: &str) -> ErrorContext {
        ErrorContext::new(&self.operation, &self.endpoint)
            .with_method(self.http_method.as_str())
            .with_user_id(user_id)
            .with_info("request_id", self.request_id.to_string())
    }
}

/// Successful result of a call.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// Parsed JSON whose `relatedHTTPCode` was 200
    Json(Value),
    /// Unchecked response of a non-JSON call
    Raw(RawResponse),
}

impl ResponseBody {
    /// The JSON value, if this was a JSON call.
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// The raw response, if this was a non-JSON call.
    #[must_use]
    pub fn into_raw(self) -> Option<RawResponse> {
        match self {
            Self::Raw(raw) => Some(raw),
            Self::Json(_) => None,
        }
    }
}

/// Status, headers and body of a non-JSON call.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl RawResponse {
    /// Transport status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
