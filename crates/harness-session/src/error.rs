//! Session errors.

use std::{io, time::Duration};

use harness_core::CoreError;
use harness_process::ProcessError;
use harness_rpc::CallError;
use thiserror::Error;

/// Session error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("Session setup error: {0}")]
    Core(#[from] CoreError),
    #[error("Failed to prepare working directory: {0}")]
    Scaffold(#[source] io::Error),
    #[error("Session is closed")]
    Closed,
    #[error("Unable to call /quit handler: {0}")]
    Quit(#[source] reqwest::Error),
    #[error("Timeout killing child process after {0:?}")]
    ShutdownTimeout(Duration),
    #[error("Error waiting for child process: {0}")]
    Wait(#[source] io::Error),
    #[error("Failed to remove working directory: {0}")]
    Cleanup(#[source] io::Error),
}
