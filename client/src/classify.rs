//! Converts transport and protocol failures into [`ClientError`] kinds.
//!
//! Success needs two checks: the transport status must be 200 or 201, and a
//! JSON body must carry `relatedHTTPCode == 200`. Nothing here retries.

use crate::error::{ClientError, ClientResult, ErrorContext};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const RELATED_HTTP_CODE: &str = "relatedHTTPCode";
const ENVELOPE_FIELDS: [&str; 3] = [
    "exceptionErrorMessage",
    "exceptionSystemAction",
    "exceptionUserAction",
];

/// Transport statuses that count as success.
#[must_use]
pub fn is_transport_success(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED)
}

/// Classify a failed send or body read.
///
/// Timeouts win over connect failures, since a connect that times out
/// reports both.
#[must_use]
pub fn transport(err: reqwest::Error, timeout: Duration, context: &ErrorContext) -> ClientError {
    let mut context = context.clone();
    if let Some(status) = err.status() {
        context.http_status = Some(status.as_u16());
    }

    if err.is_timeout() {
        let connect_phase = err.is_connect();
        timed_out(timeout, connect_phase, context, Some(err))
    } else if err.is_connect() {
        ClientError::connection(err.to_string(), context, Some(err))
    } else {
        ClientError::unknown(err.to_string(), context, Some(err))
    }
}

/// `Timeout` for a call that ran out of time.
///
/// `timeout` is the per-request limit. When the connect phase timed out the
/// session's connect timeout fired instead; that case is marked with
/// `phase=connect` in `additional_info`.
#[must_use]
pub fn timed_out(
    timeout: Duration,
    connect_phase: bool,
    mut context: ErrorContext,
    source: Option<reqwest::Error>,
) -> ClientError {
    if connect_phase {
        context = context.with_info("phase", "connect");
    }
    ClientError::Timeout {
        timeout,
        context: Box::new(context),
        source,
    }
}

/// Classify a response whose transport status was not 200/201.
///
/// A readable body makes it `ClientRejected`; a body that cannot be read
/// makes it `Unknown`.
#[must_use]
pub fn rejection(
    status: StatusCode,
    body: Result<String, reqwest::Error>,
    context: &ErrorContext,
) -> ClientError {
    let mut context = context.clone().with_status(status.as_u16());
    match body {
        Ok(text) => {
            if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
                record_envelope(&parsed, &mut context);
            }
            ClientError::ClientRejected {
                status: status.as_u16(),
                response_text: text,
                context: Box::new(context),
            }
        }
        Err(err) => ClientError::unknown(
            format!("HTTP {status} with unreadable body: {err}"),
            context,
            Some(err),
        ),
    }
}

/// Parse a body expected to be JSON.
///
/// # Errors
///
/// `InvalidParameter` carrying the decode error and the raw text.
pub fn parse_json(text: &str, context: &ErrorContext) -> ClientResult<Value> {
    serde_json::from_str(text).map_err(|e| ClientError::InvalidParameter {
        message: format!("response is not valid JSON: {e}"),
        context: Box::new(context.clone().with_info("response_text", text)),
        source: Some(e),
    })
}

/// Accept a parsed body only when `relatedHTTPCode` is exactly 200.
///
/// # Errors
///
/// `ApiError` carrying the body for any other code, including a missing one.
pub fn related_http_code(body: Value, context: &ErrorContext) -> ClientResult<Value> {
    let code = body.get(RELATED_HTTP_CODE).and_then(Value::as_i64);
    if code == Some(200) {
        return Ok(body);
    }

    let mut context = context.clone();
    record_envelope(&body, &mut context);
    Err(ClientError::ApiError {
        related_http_code: code,
        body,
        context: Box::new(context),
    })
}

fn record_envelope(body: &Value, context: &mut ErrorContext) {
    if let Some(code) = body.get(RELATED_HTTP_CODE) {
        context
            .additional_info
            .insert(RELATED_HTTP_CODE.to_string(), code.to_string());
    }
    for field in ENVELOPE_FIELDS {
        if let Some(text) = body.get(field).and_then(Value::as_str) {
            context
                .additional_info
                .insert(field.to_string(), text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn ctx() -> ErrorContext {
        ErrorContext::new("find_assets", "https://localhost:9443/servers/v/api/open-metadata/x")
            .with_method("POST")
    }

    #[test]
    fn test_transport_success_statuses() {
        assert!(is_transport_success(StatusCode::OK));
        assert!(is_transport_success(StatusCode::CREATED));
        assert!(!is_transport_success(StatusCode::NO_CONTENT));
        assert!(!is_transport_success(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_connect_phase_timeout_is_marked() {
        let err = timed_out(Duration::from_secs(30), true, ctx(), None);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(
            err.context().additional_info.get("phase").map(String::as_str),
            Some("connect")
        );

        let err = timed_out(Duration::from_secs(30), false, ctx(), None);
        assert!(!err.context().additional_info.contains_key("phase"));
    }

    #[test]
    fn test_related_code_200_is_success() {
        let body = json!({"relatedHTTPCode": 200, "element": {"x": 1}});
        let value = related_http_code(body, &ctx()).unwrap();
        assert_eq!(value["element"]["x"], 1);
    }

    #[test]
    fn test_related_code_other_is_api_error() {
        let body = json!({
            "relatedHTTPCode": 404,
            "exceptionErrorMessage": "OMAG-ASSET-404 asset not found",
            "exceptionUserAction": "check the GUID",
        });
        let err = related_http_code(body, &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        let info = &err.context().additional_info;
        assert_eq!(info.get("relatedHTTPCode").map(String::as_str), Some("404"));
        assert_eq!(
            info.get("exceptionErrorMessage").map(String::as_str),
            Some("OMAG-ASSET-404 asset not found")
        );
        match err {
            ClientError::ApiError {
                related_http_code,
                body,
                ..
            } => {
                assert_eq!(related_http_code, Some(404));
                assert_eq!(body["exceptionUserAction"], "check the GUID");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_related_code_is_api_error() {
        for body in [json!({"element": {}}), json!([1, 2]), json!({"relatedHTTPCode": "200"})] {
            let err = related_http_code(body, &ctx()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ApiError);
        }
    }

    #[test]
    fn test_parse_json_failure() {
        let err = parse_json("<html>oops</html>", &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            err.context().additional_info.get("response_text").map(String::as_str),
            Some("<html>oops</html>")
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_rejection_with_body() {
        let err = rejection(
            StatusCode::BAD_REQUEST,
            Ok(r#"{"relatedHTTPCode":400,"exceptionErrorMessage":"bad guid"}"#.to_string()),
            &ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::ClientRejected);
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(
            err.context().additional_info.get("exceptionErrorMessage").map(String::as_str),
            Some("bad guid")
        );

        let err = rejection(StatusCode::SERVICE_UNAVAILABLE, Ok("down".to_string()), &ctx());
        match err {
            ClientError::ClientRejected { response_text, .. } => assert_eq!(response_text, "down"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
