//! Blocking façade over [`ClientSession`].
//!
//! A dedicated background runtime runs the async core. Each blocking call
//! spawns its future there and waits on a channel, so only the calling
//! thread blocks. This holds whether the caller has no runtime, sits
//! outside one, or is itself a task on a running runtime.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, ErrorContext};
use crate::request::{Request, ResponseBody};
use crate::session::ClientSession;
use crate::token::TokenSource;
use secrecy::SecretString;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, mpsc};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// Blocking form of every [`ClientSession`] operation.
#[derive(Debug)]
pub struct BlockingClientSession {
    session: Arc<ClientSession>,
    runtime: Option<Runtime>,
}

impl BlockingClientSession {
    /// Open a session on a fresh background runtime.
    ///
    /// # Errors
    ///
    /// As [`ClientSession::open`]; `Unknown` if the runtime cannot start.
    pub fn open(config: ClientConfig) -> ClientResult<Self> {
        let context =
            ErrorContext::new("open", &config.platform_url).with_user_id(&config.user_id);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("open-metadata-bridge")
            .enable_all()
            .build()
            .map_err(|e| {
                ClientError::unknown(
                    format!("failed to start background runtime: {e}"),
                    context.clone(),
                    None,
                )
            })?;

        match run_on(runtime.handle(), &context, ClientSession::open(config)) {
            Ok(session) => {
                debug!("Blocking session ready");
                Ok(Self {
                    session: Arc::new(session),
                    runtime: Some(runtime),
                })
            }
            Err(err) => {
                runtime.shutdown_background();
                Err(err)
            }
        }
    }

    /// The async session behind this façade.
    #[must_use]
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Blocking [`ClientSession::platform_origin`].
    ///
    /// # Errors
    ///
    /// As the async form.
    pub fn platform_origin(&self) -> ClientResult<String> {
        let session = Arc::clone(&self.session);
        self.block("platform_origin", async move { session.platform_origin().await })
    }

    /// Blocking [`ClientSession::create_bearer_token`].
    ///
    /// # Errors
    ///
    /// As the async form.
    pub fn create_bearer_token(
        &self,
        user_id: Option<&str>,
        password: Option<&SecretString>,
    ) -> ClientResult<SecretString> {
        let session = Arc::clone(&self.session);
        let user_id = user_id.map(str::to_string);
        let password = password.cloned();
        self.block("create_bearer_token", async move {
            session
                .create_bearer_token(user_id.as_deref(), password.as_ref())
                .await
        })
    }

    /// Blocking [`ClientSession::refresh_bearer_token`].
    ///
    /// # Errors
    ///
    /// As the async form.
    pub fn refresh_bearer_token(&self) -> ClientResult<SecretString> {
        let session = Arc::clone(&self.session);
        self.block("refresh_bearer_token", async move {
            session.refresh_bearer_token().await
        })
    }

    /// [`ClientSession::set_bearer_token`]; no network call, runs inline.
    ///
    /// # Errors
    ///
    /// As the async session's form.
    pub fn set_bearer_token(&self, token: &str) -> ClientResult<()> {
        self.session.set_bearer_token(token)
    }

    /// [`ClientSession::get_token`]: `"Bearer {token}"`, not the bare token.
    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.session.get_token()
    }

    /// Source of the installed token, if any.
    #[must_use]
    pub fn token_source(&self) -> Option<TokenSource> {
        self.session.token_source()
    }

    /// Blocking [`ClientSession::execute`].
    ///
    /// # Errors
    ///
    /// As the async form.
    pub fn execute(&self, request: Request) -> ClientResult<ResponseBody> {
        let session = Arc::clone(&self.session);
        let operation = request.operation_name().to_string();
        self.block(&operation, async move { session.execute(request).await })
    }

    /// Blocking [`ClientSession::execute_json`].
    ///
    /// # Errors
    ///
    /// As the async form.
    pub fn execute_json(&self, request: Request) -> ClientResult<Value> {
        let session = Arc::clone(&self.session);
        let operation = request.operation_name().to_string();
        self.block(&operation, async move { session.execute_json(request).await })
    }

    /// [`ClientSession::close`]. Idempotent and infallible.
    pub fn close(&self) {
        self.session.close();
    }

    fn block<F, T>(&self, operation: &str, future: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let context = ErrorContext::new(operation, self.session.platform_url())
            .with_user_id(self.session.user_id());
        match &self.runtime {
            Some(runtime) => run_on(runtime.handle(), &context, future),
            None => Err(ClientError::unknown(
                "background runtime has shut down",
                context,
                None,
            )),
        }
    }
}

/// Spawn `future` on `handle` and block the current thread until it ends.
fn run_on<F, T>(handle: &Handle, context: &ErrorContext, future: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    handle.spawn(async move {
        let _ = tx.send(future.await);
    });
    rx.recv().unwrap_or_else(|_| {
        Err(ClientError::unknown(
            "background task ended without a result",
            context.clone(),
            None,
        ))
    })
}

impl Drop for BlockingClientSession {
    fn drop(&mut self) {
        self.session.close();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
