//! Caller identity carried on outgoing requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const USER_EMAIL_HEADER: &str = "X-AppEngine-User-Email";
pub const USER_ID_HEADER: &str = "X-AppEngine-User-Id";
pub const USER_IS_ADMIN_HEADER: &str = "X-AppEngine-User-Is-Admin";
pub const USER_FEDERATED_IDENTITY_HEADER: &str = "X-AppEngine-User-Federated-Identity";
pub const USER_FEDERATED_PROVIDER_HEADER: &str = "X-AppEngine-User-Federated-Provider";

/// Headers set by [`RequestTemplate::login`] and cleared by [`RequestTemplate::logout`].
pub const IDENTITY_HEADERS: [&str; 5] = [
    USER_EMAIL_HEADER,
    USER_ID_HEADER,
    USER_IS_ADMIN_HEADER,
    USER_FEDERATED_IDENTITY_HEADER,
    USER_FEDERATED_PROVIDER_HEADER,
];

/// A signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Email address of the user.
    pub email: String,
    /// Stable user id. When empty, one is derived from the email.
    #[serde(default)]
    pub id: String,
    /// Whether the user is an application administrator.
    #[serde(default)]
    pub admin: bool,
    /// Federated identity provider, if any.
    #[serde(default)]
    pub federated_provider: String,
}

impl User {
    /// Create a user with just an email.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Set an explicit user id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Mark the user as an administrator.
    #[must_use]
    pub const fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Set the federated identity provider.
    #[must_use]
    pub fn with_federated_provider(mut self, provider: impl Into<String>) -> Self {
        self.federated_provider = provider.into();
        self
    }

    /// The id sent on the wire: the explicit id, or the CRC-32 of the email.
    #[must_use]
    pub fn effective_id(&self) -> String {
        if self.id.is_empty() {
            crc32fast::hash(self.email.as_bytes()).to_string()
        } else {
            self.id.clone()
        }
    }
}

/// Base request that every call of a session is derived from.
///
/// Only the headers travel with remote calls; method and path describe
/// the notional incoming request the test is acting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl RequestTemplate {
    /// Create an anonymous `GET /` template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Set a header value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Remove a header.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Act as the given user on subsequent calls.
    pub fn login(&mut self, user: &User) {
        self.set_header(USER_EMAIL_HEADER, user.email.as_str());
        self.set_header(USER_ID_HEADER, user.effective_id());
        self.set_header(USER_FEDERATED_IDENTITY_HEADER, user.email.as_str());
        self.set_header(
            USER_FEDERATED_PROVIDER_HEADER,
            user.federated_provider.as_str(),
        );
        self.set_header(USER_IS_ADMIN_HEADER, if user.admin { "1" } else { "0" });
    }

    /// Act as a logged-out user on subsequent calls.
    pub fn logout(&mut self) {
        for name in IDENTITY_HEADERS {
            self.remove_header(name);
        }
    }
}
