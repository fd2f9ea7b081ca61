//! Request executor: one logical call under the two-layer status check.

use crate::classify;
use crate::error::{ClientError, ClientResult, ErrorContext};
use crate::request::{HttpMethod, Payload, RawResponse, Request, ResponseBody};
use crate::session::ClientSession;
use crate::validate::validate_url;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Instant;
use tracing::{Instrument, debug, debug_span, warn};

impl ClientSession {
    /// Execute one call against the session's connection.
    ///
    /// The transport status must be 200 or 201. For JSON calls the body
    /// must then parse and carry `relatedHTTPCode == 200`; non-JSON calls
    /// return the raw response once the transport check passes.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] kind; see the crate docs for the triggers.
    pub async fn execute(&self, request: Request) -> ClientResult<ResponseBody> {
        let call = request.context(self.default_timeout());
        let span = debug_span!(
            "execute",
            operation = %call.operation,
            method = %call.http_method,
            endpoint = %call.endpoint,
            request_id = %call.request_id,
        );
        let context = call.error_context(self.user_id());

        let result = self.send(request, call.timeout, &context).instrument(span.clone()).await;
        if let Err(err) = &result {
            warn!(parent: &span, kind = %err.kind(), error = %err, "Request failed");
        }
        result
    }

    /// Execute a JSON call and return the checked body.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute).
    pub async fn execute_json(&self, request: Request) -> ClientResult<Value> {
        let request = Request {
            is_json: true,
            ..request
        };
        let operation = request.operation_name().to_string();
        let endpoint = request.endpoint.clone();
        self.execute(request).await?.into_json().ok_or_else(|| {
            ClientError::unknown(
                "JSON request produced a raw response",
                ErrorContext::new(operation, endpoint).with_user_id(self.user_id()),
                None,
            )
        })
    }

    async fn send(
        &self,
        request: Request,
        timeout: std::time::Duration,
        context: &ErrorContext,
    ) -> ClientResult<ResponseBody> {
        validate_url(&request.endpoint, context)?;
        let http = self.connection(context)?;

        if self.log_payloads() {
            debug!(payload = ?request.payload, query = ?request.query, "Request payload");
        }

        let mut builder = http
            .request(request.method.to_reqwest(), &request.endpoint)
            .headers(self.headers(request.is_json))
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = attach_payload(builder, request.method, request.payload, context)?;

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| classify::transport(e, timeout, context))?;
        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "Response received"
        );

        if !classify::is_transport_success(status) {
            return Err(classify::rejection(status, response.text().await, context));
        }

        let context = context.clone().with_status(status.as_u16());
        if !request.is_json {
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| classify::transport(e, timeout, &context))?;
            return Ok(ResponseBody::Raw(RawResponse {
                status: status.as_u16(),
                headers,
                body: body.to_vec(),
            }));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify::transport(e, timeout, &context))?;
        if self.log_payloads() {
            debug!(body = %text, "Response payload");
        }

        let body = classify::parse_json(&text, &context)?;
        classify::related_http_code(body, &context).map(ResponseBody::Json)
    }
}

fn attach_payload(
    builder: RequestBuilder,
    method: HttpMethod,
    payload: Payload,
    context: &ErrorContext,
) -> ClientResult<RequestBuilder> {
    Ok(match (method, payload) {
        (_, Payload::None) => builder,
        (HttpMethod::PostData, Payload::Json(body)) => {
            let bytes = serde_json::to_vec(&body).map_err(|e| ClientError::InvalidParameter {
                message: format!("payload could not be encoded: {e}"),
                context: Box::new(context.clone()),
                source: Some(e),
            })?;
            builder.body(bytes)
        }
        (_, Payload::Json(body)) => builder.json(&body),
        (_, Payload::Raw(bytes)) => builder.body(bytes),
    })
}
