//! Session lifecycle against a mock platform.

use open_metadata_client::{ClientConfig, ClientSession, ErrorKind, Request, TokenSource};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;
use test_utils::{MockPlatform, PLATFORM_ORIGIN, TEST_SERVER, TEST_USER, init_test_tracing, ok_envelope};
use tokio_test::{assert_err, assert_ok};

fn config(platform: &MockPlatform) -> ClientConfig {
    ClientConfig::new(platform.uri(), TEST_SERVER, TEST_USER)
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_open_probes_platform() {
    init_test_tracing();
    let platform = MockPlatform::start().await;

    let session = assert_ok!(ClientSession::open(config(&platform)).await);

    assert_eq!(platform.requests_to("/api/about").await.len(), 1);
    assert_eq!(session.server_name(), TEST_SERVER);
    assert_eq!(session.user_id(), TEST_USER);
    assert!(!session.is_closed());
    assert!(session.get_token().is_none());
}

#[tokio::test]
async fn test_open_rejects_malformed_input_without_network() {
    let platform = MockPlatform::start_bare().await;

    let bad_server = ClientConfig::new(platform.uri(), "", TEST_USER);
    let err = assert_err!(ClientSession::open(bad_server).await);
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let bad_server = ClientConfig::new(platform.uri(), "view server", TEST_USER);
    let err = assert_err!(ClientSession::open(bad_server).await);
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let no_scheme = ClientConfig::new(platform.uri().replace("http://", ""), TEST_SERVER, TEST_USER);
    let err = assert_err!(ClientSession::open(no_scheme).await);
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(err.context().operation, "open");

    assert!(platform.requests().await.is_empty());
}

#[tokio::test]
async fn test_failed_probe_is_connection_error() {
    // Nothing mounted: the probe gets a 404.
    let platform = MockPlatform::start_bare().await;

    let err = assert_err!(ClientSession::open(config(&platform)).await);
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.context().endpoint.ends_with("/api/about"));
}

#[tokio::test]
async fn test_unreachable_platform_is_connection_error() {
    let config = ClientConfig::new("https://127.0.0.1:1", TEST_SERVER, TEST_USER);

    let err = assert_err!(ClientSession::open(config).await);
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_slow_probe_is_connection_error() {
    let platform = MockPlatform::start_bare().await;
    platform
        .mount_delayed_json("GET", "/api/about", ok_envelope(serde_json::json!({})), Duration::from_secs(2))
        .await;

    let config = config(&platform).with_probe_timeout(Duration::from_millis(200));
    let err = assert_err!(ClientSession::open(config).await);
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let platform = MockPlatform::start().await;
    let session = ClientSession::open(config(&platform)).await.unwrap();

    session.close();
    session.close();
    assert!(session.is_closed());

    let err = assert_err!(session.execute(Request::get(platform.endpoint("/x"))).await);
    assert_eq!(err.kind(), ErrorKind::Connection);
    session.close();
}

#[tokio::test]
async fn test_close_after_failed_call() {
    let platform = MockPlatform::start().await;
    let session = ClientSession::open(config(&platform)).await.unwrap();

    assert_err!(session.execute(Request::get(platform.endpoint("/missing"))).await);
    session.close();
    session.close();
}

#[tokio::test]
async fn test_platform_origin_and_paths() {
    let platform = MockPlatform::start().await;
    let session = ClientSession::open(config(&platform).with_page_size(25))
        .await
        .unwrap();

    assert_eq!(session.platform_origin().await.unwrap(), PLATFORM_ORIGIN);
    assert_eq!(
        session.base_path(),
        format!("{}/servers/{TEST_SERVER}/api/open-metadata", platform.uri())
    );
    assert_eq!(
        session.paging_query(10, None),
        vec![
            ("startFrom".to_string(), "10".to_string()),
            ("pageSize".to_string(), "25".to_string()),
        ]
    );
    assert_eq!(session.paging_query(0, Some(5))[1].1, "5");
}

#[tokio::test]
async fn test_trailing_slash_is_trimmed() {
    let platform = MockPlatform::start().await;
    let config = ClientConfig::new(format!("{}/", platform.uri()), TEST_SERVER, TEST_USER);

    let session = ClientSession::open(config).await.unwrap();
    assert_eq!(session.platform_url(), platform.uri());
}

#[tokio::test]
async fn test_configured_token_and_api_key_headers() {
    let platform = MockPlatform::start().await;
    platform
        .mount_json("GET", &MockPlatform::api_path("/ping"), 200, ok_envelope(serde_json::json!({})))
        .await;

    let config = config(&platform)
        .with_token("preset-token", TokenSource::ExternallySupplied)
        .with_api_key("key-42");
    let session = ClientSession::open(config).await.unwrap();

    assert_eq!(session.get_token().as_deref(), Some("Bearer preset-token"));
    assert_eq!(session.token_source(), Some(TokenSource::ExternallySupplied));

    session
        .execute_json(Request::get(platform.endpoint("/ping")))
        .await
        .unwrap();

    let seen = platform.requests_to(&MockPlatform::api_path("/ping")).await;
    let headers = &seen[0].headers;
    assert_eq!(headers.get("authorization").unwrap(), "Bearer preset-token");
    assert_eq!(headers.get("x-api-key").unwrap(), "key-42");
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
}

#[tokio::test]
async fn test_blank_preset_token_is_rejected_before_network() {
    let platform = MockPlatform::start_bare().await;

    for token in ["", "   "] {
        let config = config(&platform).with_token(token, TokenSource::ExternallySupplied);
        let err = assert_err!(ClientSession::open(config).await);
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            err.context().additional_info.get("field").map(String::as_str),
            Some("token")
        );
    }

    let config = config(&platform).with_token("line\nbreak", TokenSource::PlatformIssued);
    let err = assert_err!(ClientSession::open(config).await);
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    assert!(platform.requests().await.is_empty());
}

#[tokio::test]
async fn test_drop_releases_connection() {
    let platform = MockPlatform::start().await;
    let open_session = ClientSession::open(config(&platform)).await.unwrap();
    let closed_session = ClientSession::open(config(&platform)).await.unwrap();
    closed_session.close();

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        drop(open_session);
        drop(closed_session);
    });

    assert_eq!(logs.contents().matches("Session closed").count(), 1);
}
