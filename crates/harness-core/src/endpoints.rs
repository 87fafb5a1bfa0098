//! Discovered backend endpoints.

use serde::{Deserialize, Serialize};

/// Base URLs announced by the backend at startup.
///
/// Both are required before any remote call is made, and neither
/// changes once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    api: String,
    admin: String,
}

impl Endpoints {
    /// Record a discovered endpoint pair.
    #[must_use]
    pub fn new(api: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            admin: admin.into(),
        }
    }

    /// Base URL of the API surface. Remote calls are posted here.
    #[must_use]
    pub fn api(&self) -> &str {
        &self.api
    }

    /// Base URL of the administrative control surface.
    #[must_use]
    pub fn admin(&self) -> &str {
        &self.admin
    }

    /// URL of the cooperative quit handler on the admin surface.
    #[must_use]
    pub fn quit_url(&self) -> String {
        format!("{}/quit", self.admin.trim_end_matches('/'))
    }
}
