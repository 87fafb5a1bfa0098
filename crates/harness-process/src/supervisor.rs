//! Launching the backend and waiting for its endpoints.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use harness_core::{Endpoints, Options, PrepareHook};

use crate::{
    ProcessError,
    command::CommandBuilder,
    diagnostics,
    discovery::{EndpointDiscovery, LogScanDiscovery},
    exit::ExitWatch,
    locate::{self, Binaries},
};

/// A running backend whose endpoints are known.
///
/// Dropping it kills the backend's whole process group.
#[derive(Debug)]
pub struct ChildProcess {
    watch: ExitWatch,
    endpoints: Endpoints,
}

impl ChildProcess {
    /// The endpoints the backend announced.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// OS process id of the backend.
    #[must_use]
    pub const fn id(&self) -> Option<u32> {
        self.watch.id()
    }

    /// Take the task watching for the backend's exit.
    #[must_use]
    pub fn into_exit_watch(self) -> ExitWatch {
        self.watch
    }
}

/// Launches the backend and owns its startup.
pub struct ProcessSupervisor {
    interpreters: Vec<String>,
    executable: String,
    override_var: String,
    executable_override: Option<PathBuf>,
    extra_args: Vec<String>,
    prepare: Option<PrepareHook>,
    startup_timeout: Duration,
    echo_diagnostics: bool,
    discovery: Arc<dyn EndpointDiscovery>,
}

impl ProcessSupervisor {
    /// Create a supervisor that discovers endpoints by scanning stderr.
    ///
    /// # Errors
    /// Returns error if the announcement patterns fail to compile.
    pub fn new(options: &Options) -> Result<Self, ProcessError> {
        Ok(Self {
            interpreters: options.interpreter_candidates.clone(),
            executable: options.executable.clone(),
            override_var: options.override_var.clone(),
            executable_override: options.executable_override.clone(),
            extra_args: options.extra_args.clone(),
            prepare: options.prepare.clone(),
            startup_timeout: options.startup_timeout,
            echo_diagnostics: options.echo_diagnostics,
            discovery: Arc::new(LogScanDiscovery::new()?),
        })
    }

    /// Replace the discovery mechanism.
    #[must_use]
    pub fn with_discovery(mut self, discovery: Arc<dyn EndpointDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Locate the interpreter and the backend executable.
    ///
    /// # Errors
    /// Returns error naming whichever binary could not be found.
    pub async fn locate(&self) -> Result<Binaries, ProcessError> {
        let interpreter = locate::find_interpreter(&self.interpreters).await?;
        let executable = locate::find_executable(
            self.executable_override.as_deref(),
            &self.override_var,
            &self.executable,
        )
        .await?;
        Ok(Binaries {
            interpreter,
            executable,
        })
    }

    /// Start the backend in `working_dir` and wait for both endpoints.
    ///
    /// Runs the preparation hook first; a hook failure aborts before
    /// anything is located or spawned. If the endpoints are not announced
    /// within the startup timeout the backend is killed.
    ///
    /// # Errors
    /// Returns error if preparation, location, spawn or discovery fails.
    pub async fn start(&self, working_dir: &Path) -> Result<ChildProcess, ProcessError> {
        if let Some(prepare) = &self.prepare {
            prepare().map_err(|e| ProcessError::Prepare(format!("{e:#}")))?;
        }

        let binaries = self.locate().await?;
        let parts = CommandBuilder::new(binaries)
            .extend_params(self.extra_args.iter().cloned())
            .build(working_dir)?;

        tracing::info!(
            program = %parts.program.display(),
            dir = %working_dir.display(),
            "Starting backend"
        );

        let mut child = parts
            .into_command()
            .group_spawn()
            .map_err(ProcessError::Spawn)?;

        let Some(stderr) = child.inner().stderr.take() else {
            kill_quietly(&mut child).await;
            return Err(ProcessError::MissingStderr);
        };

        let echo = self.echo_diagnostics.then(tokio::io::stderr);
        let (_pump, lines) = diagnostics::spawn_pump(stderr, echo);

        match self.discovery.discover(lines, self.startup_timeout).await {
            Ok(endpoints) => {
                tracing::info!(
                    pid = ?child.id(),
                    api = %endpoints.api(),
                    admin = %endpoints.admin(),
                    "Backend ready"
                );
                Ok(ChildProcess {
                    watch: ExitWatch::spawn(child),
                    endpoints,
                })
            }
            Err(err) => {
                kill_quietly(&mut child).await;
                Err(err.into())
            }
        }
    }
}

async fn kill_quietly(child: &mut AsyncGroupChild) {
    if let Err(e) = child.kill().await {
        tracing::debug!(pid = ?child.id(), "Failed to kill backend: {e}");
    }
}
