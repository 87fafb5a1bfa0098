//! Process supervision errors.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{command::CommandBuildError, discovery::DiscoveryError};

/// Error raised while starting or stopping the backend.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Could not find interpreter (tried: {0})")]
    InterpreterNotFound(String),
    #[error("Could not find {0}: not found on PATH")]
    ExecutableNotFound(String),
    #[error("Invalid {origin}: path {path:?} doesn't exist")]
    InvalidOverride { origin: String, path: PathBuf },
    #[error("Preparation hook failed: {0}")]
    Prepare(String),
    #[error("Command build error: {0}")]
    Command(#[from] CommandBuildError),
    #[error("Invalid announcement pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Spawn failed: {0}")]
    Spawn(#[source] io::Error),
    #[error("Child stderr was not captured")]
    MissingStderr,
    #[error("Timeout starting child process after {0:?}")]
    StartupTimeout(Duration),
    #[error("Error reading child process stderr: {0}")]
    Diagnostics(#[source] io::Error),
    #[error("Child process closed stderr before announcing its endpoints")]
    DiagnosticsClosed,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<DiscoveryError> for ProcessError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::Timeout(deadline) => Self::StartupTimeout(deadline),
            DiscoveryError::Stream(e) => Self::Diagnostics(e),
            DiscoveryError::Closed => Self::DiagnosticsClosed,
        }
    }
}
