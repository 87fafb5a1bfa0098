//! Backend command line building.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use thiserror::Error;
use tokio::process::Command;

use crate::locate::Binaries;

/// Flags requesting ephemeral ports, a clean consistent datastore and no
/// update check.
pub const STANDARD_FLAGS: [&str; 6] = [
    "--port=0",
    "--api_port=0",
    "--admin_port=0",
    "--skip_sdk_update_check=true",
    "--clear_datastore=true",
    "--datastore_consistency_policy=consistent",
];

/// Command build error.
#[derive(Debug, Error)]
pub enum CommandBuildError {
    #[error("Interpreter path is empty")]
    EmptyInterpreter,
    #[error("Working directory does not exist: {0:?}")]
    MissingWorkingDir(PathBuf),
}

/// Resolved command parts (program + args).
#[derive(Debug, Clone)]
pub struct CommandParts {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl CommandParts {
    /// Convert into a command with the backend's stdio wiring.
    ///
    /// stdout is inherited so the backend's output reaches the runner;
    /// stderr is piped for the diagnostic fan-out.
    #[must_use]
    pub fn into_command(self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Builder for the backend command line:
/// `<interpreter> <executable> <params...> <working_dir>`.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    pub binaries: Binaries,
    pub params: Vec<String>,
}

impl CommandBuilder {
    /// Create a builder with the standard flags.
    #[must_use]
    pub fn new(binaries: Binaries) -> Self {
        Self {
            binaries,
            params: STANDARD_FLAGS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the parameters.
    #[must_use]
    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Extend parameters.
    #[must_use]
    pub fn extend_params<I>(mut self, more: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.params.extend(more.into_iter().map(Into::into));
        self
    }

    /// Build the command for a prepared working directory.
    ///
    /// # Errors
    /// Returns error if the interpreter is empty or the directory is missing.
    pub fn build(&self, working_dir: &Path) -> Result<CommandParts, CommandBuildError> {
        if self.binaries.interpreter.as_os_str().is_empty() {
            return Err(CommandBuildError::EmptyInterpreter);
        }
        if !working_dir.is_dir() {
            return Err(CommandBuildError::MissingWorkingDir(working_dir.to_path_buf()));
        }

        let mut args = Vec::with_capacity(self.params.len() + 2);
        args.push(self.binaries.executable.clone().into_os_string());
        args.extend(self.params.iter().map(OsString::from));
        args.push(working_dir.as_os_str().to_os_string());

        Ok(CommandParts {
            program: self.binaries.interpreter.clone(),
            args,
            working_dir: working_dir.to_path_buf(),
        })
    }
}
