//! Request dispatch with retry-after-reauth and error normalization
//!
//! One logical HTTP operation: attach the current session, send, and if the
//! upstream answers 401, re-authenticate (coalesced) and resend the original
//! request exactly once. A second 401 propagates — an invalid credential or
//! a misbehaving server must not turn into a retry loop.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthCoordinator;
use crate::errors::{ClientError, Result};
use crate::session::SessionStore;

const SESSION_HEADER: &str = "X-Session-Token";

/// Sends logical operations against the upstream API.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    auth: AuthCoordinator,
}

impl Dispatcher {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        session: SessionStore,
        auth: AuthCoordinator,
    ) -> Self {
        Self { http, base_url, session, auth }
    }

    /// Raw transport handle, for the upload pipeline's direct binary calls.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for an API path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Dispatch one logical operation and normalize the response.
    ///
    /// `GET` payloads are sent as query parameters; mutation payloads as JSON
    /// bodies. Returns the parsed response body on success.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value> {
        let response = self.send_once(method.clone(), path, payload).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            debug!(%method, path, "session expired, re-authenticating");
            self.auth.authenticate().await?;
            self.send_once(method, path, payload).await?
        } else {
            response
        };

        Self::normalize(response).await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!(%method, %url, "sending request");

        let mut builder = self.http.request(method.clone(), &url);

        if let Some(token) = self.session.token().await {
            builder = builder.header(SESSION_HEADER, token);
        }

        if let Some(payload) = payload {
            builder = if method == Method::GET {
                builder.query(&query_pairs(payload))
            } else {
                builder.json(payload)
            };
        }

        builder.send().await.map_err(|e| ClientError::transport(&e))
    }

    /// Map the response to the taxonomy: non-2xx becomes `Status` with the
    /// parsed body attached, a 2xx body declaring `success: false` becomes
    /// `Application`. No raw response object survives into an error value.
    async fn normalize(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await.map_err(|e| ClientError::transport(&e))?;
        debug!(status = status.as_u16(), "received response");

        let body = parse_body(&text);

        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ClientError::Application { body });
        }

        Ok(body)
    }
}

/// Parse a response body: empty becomes `null`, invalid JSON is kept as a
/// JSON string so the classifier still sees the raw text.
fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Flatten a JSON object into query parameters. Scalar values keep their
/// literal rendering; nested structures are serialized as JSON text.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Some(map) = payload.as_object() else {
        return Vec::new();
    };

    map.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::Credentials;

    fn dispatcher(base_url: &str) -> Dispatcher {
        let http = reqwest::Client::new();
        let session = SessionStore::new();
        let credentials =
            Credentials { email: "buyer@example.com".into(), password: "secret".into() };
        let auth =
            AuthCoordinator::new(http.clone(), base_url, credentials, session.clone());
        Dispatcher::new(http, base_url.to_string(), session, auth)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "session_token": "fresh-token"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn returns_parsed_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/advertisers/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let body =
            dispatcher.dispatch(Method::GET, "advertisers/7", None).await.unwrap();

        assert_eq!(body, json!({"id": 7}));
    }

    #[tokio::test]
    async fn get_payload_becomes_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/campaigns"))
            .and(query_param("name", "spring"))
            .and(query_param("active", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let filters = json!({"name": "spring", "active": true});
        dispatcher.dispatch(Method::GET, "campaigns", Some(&filters)).await.unwrap();
    }

    #[tokio::test]
    async fn retries_once_after_reauthentication() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        let calls = AtomicUsize::new(0);
        Mock::given(method("GET"))
            .and(path("/advertisers/1"))
            .respond_with(move |_: &wiremock::Request| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(401)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"id": 1}))
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let body =
            dispatcher.dispatch(Method::GET, "advertisers/1", None).await.unwrap();

        assert_eq!(body, json!({"id": 1}));
        let requests = server.received_requests().await.unwrap();
        let logins = requests.iter().filter(|r| r.url.path() == "/login").count();
        assert_eq!(logins, 1);
    }

    #[tokio::test]
    async fn retried_request_carries_fresh_token() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        // Only a request carrying the fresh token succeeds.
        Mock::given(method("GET"))
            .and(path("/advertisers/1"))
            .and(header(SESSION_HEADER, "fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/advertisers/1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let body =
            dispatcher.dispatch(Method::GET, "advertisers/1", None).await.unwrap();

        assert_eq!(body, json!({"id": 1}));
    }

    #[tokio::test]
    async fn second_unauthorized_propagates_instead_of_looping() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("GET"))
            .and(path("/advertisers/1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let err =
            dispatcher.dispatch(Method::GET, "advertisers/1", None).await.unwrap_err();

        assert!(matches!(err, ClientError::Status { status: 401, .. }));
        let requests = server.received_requests().await.unwrap();
        let fetches = requests.iter().filter(|r| r.url.path() == "/advertisers/1").count();
        let logins = requests.iter().filter(|r| r.url.path() == "/login").count();
        assert_eq!(fetches, 2);
        assert_eq!(logins, 1);
    }

    #[tokio::test]
    async fn non_success_status_carries_parsed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/campaigns"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"errors": {"base": ["name is required"]}})),
            )
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let err = dispatcher
            .dispatch(Method::POST, "campaigns", Some(&json!({"x": 1})))
            .await
            .unwrap_err();

        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, json!({"errors": {"base": ["name is required"]}}));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn embedded_failure_in_success_status_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/campaigns"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "quota exceeded"})),
            )
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let err = dispatcher
            .dispatch(Method::POST, "campaigns", Some(&json!({"x": 1})))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Application { .. }));
    }

    #[tokio::test]
    async fn unparsable_body_is_kept_as_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/advertisers/1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        let err =
            dispatcher.dispatch(Method::GET, "advertisers/1", None).await.unwrap_err();

        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, Value::String("Bad Gateway".to_string()));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
