//! Session lifecycle for the ephemeral backend test harness.
//!
//! Provides:
//! - `SessionContext` - Start a backend, call it, close it
//! - `ShutdownCoordinator` - Cooperative quit, then forced kill
//! - Working directory scaffolding

pub mod context;
pub mod error;
pub mod scaffold;
pub mod shutdown;

pub use context::SessionContext;
pub use error::SessionError;
pub use shutdown::{Backend, ShutdownCoordinator};

pub use harness_core::{Options, User};
pub use harness_rpc::{CallError, CallOptions};
