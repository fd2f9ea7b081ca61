//! Client core shared by every open-metadata resource client.
//!
//! Opens an authenticated session against a platform server, manages the
//! bearer token, and executes REST calls under one error contract. Every
//! network operation exists in async form on [`ClientSession`] and in
//! blocking form on [`BlockingClientSession`].
//!
//! A call succeeds only when the transport status is 200/201 *and*, for
//! JSON calls, the body's `relatedHTTPCode` is 200. Failures are one of:
//!
//! | Kind | Trigger |
//! |---|---|
//! | `InvalidParameter` | malformed input, empty login token, undecodable JSON |
//! | `Connection` | connect failure, failed probe, closed session |
//! | `Timeout` | call exceeded its timeout |
//! | `ApiError` | transport 2xx but `relatedHTTPCode != 200` |
//! | `ClientRejected` | transport status outside 200/201 |
//! | `Unknown` | anything else |
//!
//! The core never retries and never prints.
//!
//! ```no_run
//! use open_metadata_client::{ClientConfig, ClientSession, Request};
//!
//! # async fn run() -> open_metadata_client::ClientResult<()> {
//! let config = ClientConfig::new("https://localhost:9443", "qs-view-server", "erinoverview")
//!     .with_password("secret");
//! let session = ClientSession::open(config).await?;
//! session.create_bearer_token(None, None).await?;
//!
//! let endpoint = format!("{}/asset-catalog/assets/by-search-string", session.base_path());
//! let assets = session
//!     .execute_json(Request::post(endpoint).with_query_pairs(session.paging_query(0, None)))
//!     .await?;
//! println!("{assets}");
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod classify;
pub mod config;
pub mod error;
mod executor;
pub mod request;
pub mod session;
pub mod token;
pub mod validate;

pub use blocking::BlockingClientSession;
pub use config::{ARCHIVE_TIMEOUT, BULK_TIMEOUT, ClientConfig, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult, ErrorContext, ErrorKind};
pub use request::{HttpMethod, Payload, RawResponse, Request, RequestContext, ResponseBody, slim_body};
pub use session::ClientSession;
pub use token::{BearerToken, TokenSource};
