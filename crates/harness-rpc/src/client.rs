//! Remote call client.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use harness_core::SessionToken;
use reqwest::{StatusCode, header::CONTENT_TYPE};
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};

use crate::{CallError, RequestEnvelope, ResponseEnvelope};

/// Methods answered locally with an empty payload.
///
/// The backend runs a single namespace, so namespace queries never need
/// to reach it.
pub const LOCAL_METHODS: [(&str, &str); 2] = [
    ("__go__", "GetNamespace"),
    ("__go__", "GetDefaultNamespace"),
];

/// The local answer for a whitelisted method, if any.
#[must_use]
pub fn local_answer(service: &str, method: &str) -> Option<Bytes> {
    LOCAL_METHODS
        .iter()
        .any(|&(s, m)| s == service && m == method)
        .then(Bytes::new)
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline for the exchange. `None` or zero waits indefinitely.
    pub timeout: Option<Duration>,
    /// Caller-side cancellation.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// One remote call.
#[derive(Debug, Clone)]
pub struct RemoteCall {
    pub service: String,
    pub method: String,
    pub payload: Bytes,
    /// Identity headers attached to the exchange.
    pub headers: HashMap<String, String>,
    pub options: CallOptions,
}

impl RemoteCall {
    /// Create a call with no headers and no timeout.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            payload: payload.into(),
            headers: HashMap::new(),
            options: CallOptions::default(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

/// Issues remote calls against the backend's API endpoint.
///
/// Every call carries the session token as its request id.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    api_url: String,
    request_id: SessionToken,
}

impl RpcClient {
    /// Create a client for `api_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, request_id: SessionToken) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            request_id,
        }
    }

    /// The API endpoint calls are posted to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Perform one exchange.
    ///
    /// If a timeout is set and fires first, the exchange is abandoned and
    /// the call fails with [`CallError::Timeout`]; a caller cancellation
    /// fails with [`CallError::Canceled`]. An application error in the
    /// response wins over the transport outcome.
    ///
    /// # Errors
    /// Returns error if the exchange fails, times out, is canceled, or the
    /// backend reports an application error.
    pub async fn call(&self, call: RemoteCall) -> Result<Bytes, CallError> {
        if let Some(answer) = local_answer(&call.service, &call.method) {
            tracing::debug!(service = %call.service, method = %call.method, "Answered locally");
            return Ok(answer);
        }

        let envelope = RequestEnvelope::new(
            &call.service,
            &call.method,
            &call.payload,
            self.request_id.as_str(),
        );
        let body = serde_json::to_vec(&envelope)?;

        let cancel = call
            .options
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let timed_out = Arc::new(AtomicBool::new(false));
        let _timer = call
            .options
            .timeout
            .filter(|d| !d.is_zero())
            .map(|timeout| {
                let cancel = cancel.clone();
                let timed_out = Arc::clone(&timed_out);
                AbortOnDropHandle::new(tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    timed_out.store(true, Ordering::SeqCst);
                    cancel.cancel();
                }))
            });

        let result = tokio::select! {
            res = self.exchange(&call.headers, body) => res,
            () = cancel.cancelled() => Err(CallError::Canceled),
        };

        // The timer may have fired while the exchange was finishing.
        if timed_out.load(Ordering::SeqCst) {
            return Err(CallError::Timeout);
        }

        let (status, body) = result?;
        let response = match serde_json::from_slice::<ResponseEnvelope>(&body) {
            Ok(response) => response,
            Err(_) if !status.is_success() => return Err(CallError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };
        if let Some(err) = response.application_error {
            return Err(CallError::Application {
                service: call.service,
                code: err.code,
                detail: err.detail,
            });
        }
        if !status.is_success() {
            return Err(CallError::Status(status.as_u16()));
        }
        Ok(Bytes::from(response.decode_response()?))
    }

    async fn exchange(
        &self,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<(StatusCode, Bytes), CallError> {
        let mut request = self
            .http
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        Ok((status, response.bytes().await?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Router,
        body::Bytes as Body,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
    };

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    fn client(api_url: String) -> RpcClient {
        RpcClient::new(
            reqwest::Client::new(),
            api_url,
            SessionToken::from("00112233445566778899aabbccddeeff".to_string()),
        )
    }

    async fn echo(body: Body) -> Vec<u8> {
        let req: RequestEnvelope = serde_json::from_slice(&body).unwrap();
        let mut payload = format!("{}.{}:{}:", req.service_name, req.method, req.request_id)
            .into_bytes();
        payload.extend(req.decode_request().unwrap());
        serde_json::to_vec(&ResponseEnvelope::success(&payload)).unwrap()
    }

    async fn fail(_body: Body) -> Vec<u8> {
        serde_json::to_vec(&ResponseEnvelope::application_error(5, "boom")).unwrap()
    }

    async fn hang(_body: Body) -> Vec<u8> {
        std::future::pending::<()>().await;
        Vec::new()
    }

    async fn broken(_body: Body) -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "oops")
    }

    async fn broken_with_envelope(_body: Body) -> impl IntoResponse {
        let body = serde_json::to_vec(&ResponseEnvelope::application_error(5, "boom")).unwrap();
        (StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    #[tokio::test]
    async fn test_call_roundtrip() {
        let url = serve(Router::new().route("/", post(echo))).await;
        let out = client(url)
            .call(RemoteCall::new("memcache", "Get", &b"key"[..]))
            .await
            .unwrap();
        assert_eq!(
            &out[..],
            b"memcache.Get:00112233445566778899aabbccddeeff:key"
        );
    }

    #[tokio::test]
    async fn test_application_error_is_distinguished() {
        let url = serve(Router::new().route("/", post(fail))).await;
        let err = client(url)
            .call(RemoteCall::new("datastore_v3", "Put", Bytes::new()))
            .await
            .unwrap_err();

        match err {
            CallError::Application {
                service,
                code,
                detail,
            } => {
                assert_eq!(service, "datastore_v3");
                assert_eq!(code, 5);
                assert_eq!(detail, "boom");
            }
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinguished() {
        let url = serve(Router::new().route("/", post(hang))).await;
        let call = RemoteCall::new("memcache", "Get", Bytes::new())
            .with_options(CallOptions::new().with_timeout(Duration::from_millis(1)));

        let err = tokio::time::timeout(Duration::from_secs(5), client(url).call(call))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert_eq!(err.code(), Some(crate::error::DEADLINE_EXCEEDED_CODE));
    }

    #[tokio::test]
    async fn test_caller_cancel_is_not_timeout() {
        let url = serve(Router::new().route("/", post(hang))).await;
        let cancel = CancellationToken::new();
        let call = RemoteCall::new("memcache", "Get", Bytes::new()).with_options(
            CallOptions::new()
                .with_timeout(Duration::from_secs(30))
                .with_cancel(cancel.clone()),
        );

        let client = client(url);
        let handle = tokio::spawn(async move { client.call(call).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, CallError::Canceled));
    }

    #[tokio::test]
    async fn test_headers_are_forwarded() {
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/",
            post(move |headers: HeaderMap, body: Body| async move {
                let email = headers
                    .get("X-AppEngine-User-Email")
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string);
                *captured.lock().unwrap() = email;
                echo(body).await
            }),
        );
        let url = serve(router).await;

        let headers = HashMap::from([(
            "X-AppEngine-User-Email".to_string(),
            "a@b.com".to_string(),
        )]);
        client(url)
            .call(RemoteCall::new("user", "Whoami", Bytes::new()).with_headers(headers))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let url = serve(Router::new().route("/", post(broken))).await;
        let err = client(url)
            .call(RemoteCall::new("memcache", "Get", Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Status(500)));
    }

    #[tokio::test]
    async fn test_application_error_wins_over_http_status() {
        let url = serve(Router::new().route("/", post(broken_with_envelope))).await;
        let err = client(url)
            .call(RemoteCall::new("datastore_v3", "Put", Bytes::new()))
            .await
            .unwrap_err();
        assert!(err.is_application(), "{err:?}");
        assert_eq!(err.code(), Some(5));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let call = RemoteCall::new("memcache", "Get", Bytes::new())
            .with_options(CallOptions::new().with_timeout(Duration::from_secs(5)));
        let err = client(format!("http://{addr}")).call(call).await.unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
    }

    #[tokio::test]
    async fn test_namespace_queries_answered_locally() {
        // Nothing listens here; a network attempt would fail.
        let client = client("http://127.0.0.1:1".to_string());
        for (service, method) in LOCAL_METHODS {
            let out = client
                .call(RemoteCall::new(service, method, Bytes::new()))
                .await
                .unwrap();
            assert!(out.is_empty());
        }
        assert!(local_answer("__go__", "GetAppId").is_none());
        assert!(local_answer("memcache", "GetNamespace").is_none());
    }
}
