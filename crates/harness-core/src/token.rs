//! Session correlation token.

use std::fmt;

use crate::CoreError;

/// Random 128-bit token, hex encoded.
///
/// Every call made through a session carries it as the request id.
/// It never changes after creation, so it can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the OS entropy source.
    ///
    /// # Errors
    /// Returns error if the entropy source is unavailable.
    pub fn generate() -> Result<Self, CoreError> {
        let mut buf = [0u8; 16];
        getrandom::getrandom(&mut buf)?;
        Ok(Self(hex::encode(buf)))
    }

    /// The hex rendering of the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
