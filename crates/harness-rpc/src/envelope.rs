//! Wire envelopes for remote calls.
//!
//! Payloads are opaque to the harness and travel base64 encoded.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// Request sent to the API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub service_name: String,
    pub method: String,
    /// Request payload (base64 encoded).
    pub request: String,
    /// Correlation id; the session token.
    pub request_id: String,
}

impl RequestEnvelope {
    /// Create a request envelope from raw payload bytes.
    #[must_use]
    pub fn new(service_name: &str, method: &str, payload: &[u8], request_id: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            method: method.to_string(),
            request: BASE64.encode(payload),
            request_id: request_id.to_string(),
        }
    }

    /// Decode the request payload from base64.
    ///
    /// # Errors
    /// Returns error if the payload is not valid base64.
    pub fn decode_request(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.request)
    }
}

/// Logical failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationError {
    pub code: i32,
    pub detail: String,
}

/// Response returned by the API endpoint.
///
/// An application error takes precedence over any payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Response payload (base64 encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_error: Option<ApplicationError>,
}

impl ResponseEnvelope {
    /// Create a successful response from raw bytes.
    #[must_use]
    pub fn success(payload: &[u8]) -> Self {
        Self {
            response: Some(BASE64.encode(payload)),
            application_error: None,
        }
    }

    /// Create an application error response.
    #[must_use]
    pub fn application_error(code: i32, detail: impl Into<String>) -> Self {
        Self {
            response: None,
            application_error: Some(ApplicationError {
                code,
                detail: detail.into(),
            }),
        }
    }

    /// Decode the response payload. A missing payload is empty.
    ///
    /// # Errors
    /// Returns error if the payload is not valid base64.
    pub fn decode_response(&self) -> Result<Vec<u8>, base64::DecodeError> {
        self.response
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), |data| BASE64.decode(data))
    }
}
