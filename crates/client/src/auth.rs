//! Login and single-flight coalescing of authentication attempts
//!
//! Any number of requests can observe a 401 at the same time; all of them
//! must share exactly one login call. The coordinator keeps a nullable
//! pending-attempt slot holding a shared future: the first caller starts the
//! login, late arrivals attach to it, and the slot is cleared before the
//! future settles — on success and failure alike — so a later retry can
//! issue a fresh attempt.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{ClientError, Result};
use crate::session::{Credentials, SessionStore};

type PendingLogin = Shared<BoxFuture<'static, Result<()>>>;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    /// Asks the upstream to keep the session alive longer.
    remember_me: bool,
}

/// Coordinates login attempts against the upstream.
#[derive(Clone)]
pub(crate) struct AuthCoordinator {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    http: reqwest::Client,
    login_url: String,
    credentials: Credentials,
    session: SessionStore,
    pending: Mutex<Option<PendingLogin>>,
}

impl AuthCoordinator {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
        session: SessionStore,
    ) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                http,
                login_url: format!("{base_url}/login"),
                credentials,
                session,
                pending: Mutex::new(None),
            }),
        }
    }

    /// Authenticate, coalescing with any attempt already in flight.
    ///
    /// On success the session store holds the fresh token. Failures surface
    /// as `Authentication` (logical or HTTP-level rejection) or `Transport`.
    pub(crate) async fn authenticate(&self) -> Result<()> {
        let login = {
            let mut pending = self.inner.pending.lock().await;
            match pending.as_ref() {
                Some(shared) => {
                    debug!("joining in-flight authentication attempt");
                    shared.clone()
                }
                None => {
                    let shared = Self::login(Arc::clone(&self.inner)).boxed().shared();
                    *pending = Some(shared.clone());
                    shared
                }
            }
        };

        login.await
    }

    async fn login(inner: Arc<AuthInner>) -> Result<()> {
        let result = Self::request_session(&inner).await;

        match &result {
            Ok(token) => {
                inner.session.replace(token.clone()).await;
                info!("session established");
            }
            Err(err) => warn!(error = %err, "authentication attempt failed"),
        }

        // The slot must be cleared on both paths before the shared future
        // settles, otherwise a failed login would deadlock every retry.
        *inner.pending.lock().await = None;

        result.map(|_| ())
    }

    async fn request_session(inner: &AuthInner) -> Result<String> {
        debug!(url = %inner.login_url, "sending login request");

        let body = LoginRequest {
            email: &inner.credentials.email,
            password: &inner.credentials.password,
            remember_me: true,
        };

        let response = inner
            .http
            .post(&inner.login_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::transport(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ClientError::transport(&e))?;

        if !status.is_success() {
            return Err(ClientError::Authentication(format!(
                "login failed (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            ClientError::Authentication(format!("login response was not valid JSON: {e}"))
        })?;

        if parsed.get("success").and_then(Value::as_bool) == Some(false) {
            let detail = parsed
                .get("error")
                .or_else(|| parsed.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("login rejected by server");
            return Err(ClientError::Authentication(detail.to_string()));
        }

        parsed
            .get("session_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Authentication("login response missing session_token".into())
            })
    }
}
