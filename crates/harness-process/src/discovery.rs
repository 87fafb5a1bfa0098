//! Endpoint discovery.
//!
//! The backend binds its listeners to ephemeral ports and announces the
//! resulting URLs on stderr. Discovery turns that stream into an
//! [`Endpoints`] pair, or fails once the deadline passes.

use std::{io, time::Duration};

use async_trait::async_trait;
use harness_core::Endpoints;
use regex::Regex;
use thiserror::Error;

use crate::diagnostics::DiagnosticLines;

/// Announcement of the API surface.
pub const API_ANNOUNCEMENT: &str = r"Starting API server at: (\S+)";

/// Announcement of the admin surface.
pub const ADMIN_ANNOUNCEMENT: &str = r"Starting admin server at: (\S+)";

/// Which surface an announcement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Api,
    Admin,
}

/// Discovery error.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Endpoints not announced within {0:?}")]
    Timeout(Duration),
    #[error("Diagnostic stream failed: {0}")]
    Stream(#[source] io::Error),
    #[error("Diagnostic stream closed before both endpoints were announced")]
    Closed,
}

/// Source of the backend's endpoints.
///
/// Implementations receive the backend's stderr lines and must return
/// within `deadline`. Dropping `lines` is allowed at any point; the pump
/// keeps draining the pipe regardless.
#[async_trait]
pub trait EndpointDiscovery: Send + Sync {
    /// Wait for both endpoints.
    async fn discover(
        &self,
        lines: DiagnosticLines,
        deadline: Duration,
    ) -> Result<Endpoints, DiscoveryError>;
}

/// The pair of line patterns that announce each surface.
///
/// Each pattern's first capture group is the URL.
#[derive(Debug, Clone)]
pub struct DiscoveryPatterns {
    api: Regex,
    admin: Regex,
}

impl DiscoveryPatterns {
    /// Compile a pattern pair.
    ///
    /// # Errors
    /// Returns error if either pattern is invalid.
    pub fn new(api: &str, admin: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            api: Regex::new(api)?,
            admin: Regex::new(admin)?,
        })
    }

    /// Compile the backend's standard announcements.
    ///
    /// # Errors
    /// Returns error if the built-in patterns fail to compile.
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(API_ANNOUNCEMENT, ADMIN_ANNOUNCEMENT)
    }

    /// Extract the URL announced for `kind` on `line`, if any.
    #[must_use]
    pub fn capture<'a>(&self, kind: EndpointKind, line: &'a str) -> Option<&'a str> {
        let re = match kind {
            EndpointKind::Api => &self.api,
            EndpointKind::Admin => &self.admin,
        };
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Discovery by scanning stderr lines against [`DiscoveryPatterns`].
#[derive(Debug, Clone)]
pub struct LogScanDiscovery {
    patterns: DiscoveryPatterns,
}

impl LogScanDiscovery {
    /// Scan for the backend's standard announcements.
    ///
    /// # Errors
    /// Returns error if the built-in patterns fail to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self::with_patterns(DiscoveryPatterns::standard()?))
    }

    #[must_use]
    pub const fn with_patterns(patterns: DiscoveryPatterns) -> Self {
        Self { patterns }
    }

    async fn scan(&self, lines: &mut DiagnosticLines) -> Result<Endpoints, DiscoveryError> {
        let mut api: Option<String> = None;
        let mut admin: Option<String> = None;

        while let Some(line) = lines.recv().await {
            let line = line.map_err(DiscoveryError::Stream)?;

            if api.is_none() {
                api = self
                    .patterns
                    .capture(EndpointKind::Api, &line)
                    .map(ToString::to_string);
            }
            if admin.is_none() {
                admin = self
                    .patterns
                    .capture(EndpointKind::Admin, &line)
                    .map(ToString::to_string);
            }

            if let (Some(api), Some(admin)) = (&api, &admin) {
                tracing::debug!(%api, %admin, "Discovered backend endpoints");
                return Ok(Endpoints::new(api.as_str(), admin.as_str()));
            }
        }

        Err(DiscoveryError::Closed)
    }
}

#[async_trait]
impl EndpointDiscovery for LogScanDiscovery {
    async fn discover(
        &self,
        mut lines: DiagnosticLines,
        deadline: Duration,
    ) -> Result<Endpoints, DiscoveryError> {
        tokio::time::timeout(deadline, self.scan(&mut lines))
            .await
            .map_err(|_| DiscoveryError::Timeout(deadline))?
    }
}
