//! Mock platform and response envelopes.
//!
//! [`MockPlatform`] wraps a wiremock server that answers the connectivity
//! probe, so a session can be opened against it straight away.

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Text served from `/api/about`.
pub const PLATFORM_ORIGIN: &str = "Open Metadata Platform 5.2 (test)";

/// Server name used by the fixtures.
pub const TEST_SERVER: &str = "qs-view-server";

/// User id used by the fixtures.
pub const TEST_USER: &str = "erinoverview";

/// Password used by the fixtures.
pub const TEST_PASSWORD: &str = "secret";

/// A running mock platform.
pub struct MockPlatform {
    server: MockServer,
}

impl MockPlatform {
    /// Start a platform that answers the connectivity probe.
    pub async fn start() -> Self {
        let platform = Self::start_bare().await;
        Mock::given(method("GET"))
            .and(path("/api/about"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PLATFORM_ORIGIN))
            .mount(&platform.server)
            .await;
        platform
    }

    /// Start a platform with nothing mounted.
    pub async fn start_bare() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying wiremock server.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// `{uri}/servers/{TEST_SERVER}/api/open-metadata{suffix}`
    #[must_use]
    pub fn endpoint(&self, suffix: &str) -> String {
        format!("{}{}", self.uri(), Self::api_path(suffix))
    }

    /// Path part of [`endpoint`](Self::endpoint).
    #[must_use]
    pub fn api_path(suffix: &str) -> String {
        format!("/servers/{TEST_SERVER}/api/open-metadata{suffix}")
    }

    /// Answer logins for the fixture user with `token` as raw text.
    pub async fn mount_login(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/servers/{TEST_SERVER}/api/token")))
            .and(body_json(json!({"userId": TEST_USER, "password": TEST_PASSWORD})))
            .respond_with(ResponseTemplate::new(200).set_body_string(token))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with `status` and a JSON body.
    pub async fn mount_json(&self, verb: &str, api_path: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(api_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with `status` and a text body.
    pub async fn mount_text(&self, verb: &str, api_path: &str, status: u16, body: &str) {
        Mock::given(method(verb))
            .and(path(api_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with a JSON body after `delay`.
    pub async fn mount_delayed_json(&self, verb: &str, api_path: &str, body: Value, delay: Duration) {
        Mock::given(method(verb))
            .and(path(api_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Every request the platform has seen.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Requests seen at `api_path`.
    pub async fn requests_to(&self, api_path: &str) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.url.path() == api_path)
            .collect()
    }
}

/// Success envelope: `relatedHTTPCode` 200 merged with `fields`.
#[must_use]
pub fn ok_envelope(fields: Value) -> Value {
    let mut envelope = json!({"class": "GUIDResponse", "relatedHTTPCode": 200});
    if let (Some(target), Value::Object(extra)) = (envelope.as_object_mut(), fields) {
        target.extend(extra);
    }
    envelope
}

/// Failure envelope as the platform sends it.
#[must_use]
pub fn error_envelope(related_http_code: i64, message: &str) -> Value {
    json!({
        "class": "VoidResponse",
        "relatedHTTPCode": related_http_code,
        "exceptionClassName": "InvalidParameterException",
        "exceptionErrorMessage": message,
        "exceptionSystemAction": "The system is unable to process the request.",
        "exceptionUserAction": "Correct the request and retry.",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_merges_fields() {
        let envelope = ok_envelope(json!({"element": {"x": 1}}));
        assert_eq!(envelope["relatedHTTPCode"], 200);
        assert_eq!(envelope["element"]["x"], 1);
    }

    #[test]
    fn test_error_envelope() {
        let envelope = error_envelope(404, "not found");
        assert_eq!(envelope["relatedHTTPCode"], 404);
        assert_eq!(envelope["exceptionErrorMessage"], "not found");
    }

    #[test]
    fn test_api_path() {
        assert_eq!(
            MockPlatform::api_path("/assets"),
            "/servers/qs-view-server/api/open-metadata/assets"
        );
    }
}
