//! Backend process supervision.
//!
//! Provides:
//! - Executable location (explicit override, environment, `PATH`)
//! - Launch command building
//! - `EndpointDiscovery` - Learning the backend's endpoints from its stderr
//! - `ProcessSupervisor` - Launching the backend and waiting for its endpoints
//! - `ExitWatch` - Waiting for, or forcing, the backend's exit

pub mod command;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod exit;
pub mod locate;
pub mod supervisor;

pub use command::{CommandBuilder, CommandParts};
pub use discovery::{DiscoveryError, DiscoveryPatterns, EndpointDiscovery, LogScanDiscovery};
pub use error::ProcessError;
pub use exit::ExitWatch;
pub use locate::{Binaries, resolve_executable_path};
pub use supervisor::{ChildProcess, ProcessSupervisor};
