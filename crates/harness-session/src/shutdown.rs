//! Two-phase backend shutdown.
//!
//! The backend is asked to quit through its admin surface while a task is
//! already waiting for it to exit. If it has not exited by the deadline,
//! or the request cannot be delivered, its process group is killed. The
//! working directory is removed afterwards on every path.

use std::{path::Path, time::Duration};

use harness_process::{ChildProcess, ExitWatch};
use harness_rpc::AdminClient;
use tempfile::TempDir;
use tokio::time::Instant;

use crate::SessionError;

/// The resources a running session owns, released together.
#[derive(Debug)]
pub struct Backend {
    child: ChildProcess,
    workdir: TempDir,
}

impl Backend {
    #[must_use]
    pub const fn new(child: ChildProcess, workdir: TempDir) -> Self {
        Self { child, workdir }
    }

    #[must_use]
    pub const fn child(&self) -> &ChildProcess {
        &self.child
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        self.workdir.path()
    }
}

/// Stops a backend: cooperative quit first, forced kill on timeout.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    admin: AdminClient,
    timeout: Duration,
}

impl ShutdownCoordinator {
    #[must_use]
    pub const fn new(admin: AdminClient, timeout: Duration) -> Self {
        Self { admin, timeout }
    }

    /// Stop the backend and remove its working directory.
    ///
    /// The first failure is returned; the directory is removed regardless,
    /// and a removal failure is only reported when nothing failed before it.
    ///
    /// # Errors
    /// Returns `Quit`, `ShutdownTimeout`, `Wait` or `Cleanup`.
    pub async fn shutdown(&self, backend: Backend) -> Result<(), SessionError> {
        let Backend { child, workdir } = backend;

        let stopped = self.stop(child.into_exit_watch()).await;

        let dir = workdir.path().to_path_buf();
        let removed = workdir.close().map_err(SessionError::Cleanup);
        tracing::debug!(dir = %dir.display(), ok = removed.is_ok(), "Removed working directory");

        stopped.and(removed)
    }

    async fn stop(&self, mut watch: ExitWatch) -> Result<(), SessionError> {
        let deadline = Instant::now() + self.timeout;

        match tokio::time::timeout_at(deadline, self.admin.quit()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                force_kill(watch).await;
                return Err(SessionError::Quit(e));
            }
            Err(_) => {
                force_kill(watch).await;
                return Err(SessionError::ShutdownTimeout(self.timeout));
            }
        }

        let exited = tokio::select! {
            status = watch.wait() => Some(status),
            () = tokio::time::sleep_until(deadline) => None,
        };

        match exited {
            Some(Ok(status)) => {
                tracing::debug!(pid = ?watch.id(), %status, "Backend exited");
                Ok(())
            }
            Some(Err(e)) => Err(SessionError::Wait(e)),
            None => {
                force_kill(watch).await;
                Err(SessionError::ShutdownTimeout(self.timeout))
            }
        }
    }
}

async fn force_kill(watch: ExitWatch) {
    let pid = watch.id();
    if let Err(e) = watch.kill().await {
        tracing::debug!(?pid, "Failed to kill backend: {e}");
    }
}
