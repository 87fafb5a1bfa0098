//! Remote call proxy for the ephemeral backend.
//!
//! Provides:
//! - Wire envelopes (JSON + base64)
//! - `RpcClient` - One request/response exchange per call, with timeout
//!   and cancellation
//! - `AdminClient` - The cooperative quit request

pub mod admin;
pub mod client;
pub mod envelope;
pub mod error;

pub use admin::AdminClient;
pub use client::{CallOptions, RemoteCall, RpcClient};
pub use envelope::{ApplicationError, RequestEnvelope, ResponseEnvelope};
pub use error::CallError;
