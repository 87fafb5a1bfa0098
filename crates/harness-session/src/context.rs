//! A test session: one private backend, its endpoints, and the identity
//! attached to every call.

use std::{path::Path, sync::Arc, time::Duration};

use bytes::Bytes;
use harness_core::{Endpoints, Options, RequestTemplate, SessionToken, User};
use harness_process::{EndpointDiscovery, ProcessSupervisor};
use harness_rpc::{AdminClient, CallOptions, RemoteCall, RpcClient};

use crate::{
    SessionError, scaffold,
    shutdown::{Backend, ShutdownCoordinator},
};

/// An open session against a freshly started backend.
///
/// Created ready: by the time a constructor returns, the backend has
/// announced both endpoints. [`close`](Self::close) stops it and removes
/// the working directory; after that every call fails with
/// [`SessionError::Closed`]. Dropping an open session kills the backend's
/// process group without the cooperative quit.
#[derive(Debug)]
pub struct SessionContext {
    app_id: String,
    fully_qualified_app_id: String,
    token: SessionToken,
    request: RequestTemplate,
    endpoints: Endpoints,
    rpc: RpcClient,
    call_timeout: Option<Duration>,
    shutdown: ShutdownCoordinator,
    backend: Option<Backend>,
}

impl SessionContext {
    /// Start a backend and open a session against it.
    ///
    /// # Errors
    /// Returns error if the working directory cannot be prepared or the
    /// backend cannot be started.
    pub async fn new(options: Options) -> Result<Self, SessionError> {
        let supervisor = ProcessSupervisor::new(&options)?;
        Self::start(options, supervisor).await
    }

    /// Like [`new`](Self::new), with endpoints found by `discovery`
    /// instead of scanning the backend's diagnostics.
    ///
    /// # Errors
    /// Returns error if the working directory cannot be prepared or the
    /// backend cannot be started.
    pub async fn with_discovery(
        options: Options,
        discovery: Arc<dyn EndpointDiscovery>,
    ) -> Result<Self, SessionError> {
        let supervisor = ProcessSupervisor::new(&options)?.with_discovery(discovery);
        Self::start(options, supervisor).await
    }

    async fn start(options: Options, supervisor: ProcessSupervisor) -> Result<Self, SessionError> {
        let token = SessionToken::generate()?;
        let workdir = scaffold::create_app_dir(&options.app_id).map_err(SessionError::Scaffold)?;

        // On failure the supervisor has already killed the child; dropping
        // `workdir` removes the directory.
        let child = supervisor.start(workdir.path()).await?;
        let endpoints = child.endpoints().clone();

        let http = reqwest::Client::new();
        let rpc = RpcClient::new(http.clone(), endpoints.api(), token.clone());
        let shutdown = ShutdownCoordinator::new(
            AdminClient::new(http, &endpoints),
            options.shutdown_timeout,
        );

        tracing::info!(
            app_id = %options.app_id,
            dir = %workdir.path().display(),
            "Session opened"
        );

        Ok(Self {
            fully_qualified_app_id: options.fully_qualified_app_id(),
            app_id: options.app_id,
            token,
            request: RequestTemplate::new(),
            endpoints,
            rpc,
            call_timeout: options.call_timeout,
            shutdown,
            backend: Some(Backend::new(child, workdir)),
        })
    }

    /// Call `service.method` with the session's default timeout.
    ///
    /// # Errors
    /// Returns error if the session is closed or the call fails.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes, SessionError> {
        let options = CallOptions {
            timeout: self.call_timeout,
            cancel: None,
        };
        self.call_with(service, method, payload, options).await
    }

    /// Call `service.method` with explicit per-call options.
    ///
    /// # Errors
    /// Returns error if the session is closed or the call fails.
    pub async fn call_with(
        &self,
        service: &str,
        method: &str,
        payload: impl Into<Bytes>,
        options: CallOptions,
    ) -> Result<Bytes, SessionError> {
        if self.backend.is_none() {
            return Err(SessionError::Closed);
        }
        let call = RemoteCall::new(service, method, payload)
            .with_headers(self.request.headers.clone())
            .with_options(options);
        Ok(self.rpc.call(call).await?)
    }

    /// Make later calls appear to come from `user`.
    pub fn login(&mut self, user: &User) {
        self.request.login(user);
    }

    /// Drop the signed-in identity.
    pub fn logout(&mut self) {
        self.request.logout();
    }

    #[must_use]
    pub const fn request(&self) -> &RequestTemplate {
        &self.request
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn fully_qualified_app_id(&self) -> &str {
        &self.fully_qualified_app_id
    }

    #[must_use]
    pub const fn session_token(&self) -> &SessionToken {
        &self.token
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The backend's working directory, while the session is open.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.backend.as_ref().map(Backend::working_dir)
    }

    /// OS process id of the backend, while the session is open.
    #[must_use]
    pub fn backend_pid(&self) -> Option<u32> {
        self.backend.as_ref().and_then(|backend| backend.child().id())
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// Stop the backend and remove its working directory.
    ///
    /// Closing an already closed session does nothing.
    ///
    /// # Errors
    /// Returns the first shutdown failure; the directory is removed anyway.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        let Some(backend) = self.backend.take() else {
            return Ok(());
        };
        tracing::info!(app_id = %self.app_id, "Closing session");
        self.shutdown.shutdown(backend).await
    }
}
