//! Waiting for, or forcing, the backend's exit.

use std::{io, process::ExitStatus};

use command_group::AsyncGroupChild;
use tokio::{sync::oneshot, task::JoinHandle};

/// A task that owns the child and waits for it to exit.
///
/// The owner can ask it to kill the child's process group instead; the
/// request is a message, so waiting and killing never share the handle.
/// Dropping the watch makes the same request.
#[derive(Debug)]
pub struct ExitWatch {
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    done: JoinHandle<io::Result<ExitStatus>>,
}

impl ExitWatch {
    /// Start waiting on `child`.
    #[must_use]
    pub fn spawn(mut child: AsyncGroupChild) -> Self {
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let done = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => return status,
                Ok(()) = kill_rx => {}
            }
            tracing::warn!(?pid, "Killing backend process group");
            child.start_kill()?;
            child.wait().await
        });

        Self {
            pid,
            kill_tx: Some(kill_tx),
            done,
        }
    }

    /// OS process id of the child, if it was still running when watched.
    #[must_use]
    pub const fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the child to exit on its own.
    ///
    /// Cancel-safe: dropping the future leaves the watch intact. Must not be
    /// polled again once it has completed.
    ///
    /// # Errors
    /// Returns error if waiting on the child fails.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        (&mut self.done).await.map_err(io::Error::other)?
    }

    /// Kill the child's process group and reap it.
    ///
    /// # Errors
    /// Returns error if the kill or the reap fails.
    pub async fn kill(mut self) -> io::Result<ExitStatus> {
        self.request_kill();
        (&mut self.done).await.map_err(io::Error::other)?
    }

    fn request_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            // Fails only if the child already exited; the status is in `done`.
            let _ = tx.send(());
        }
    }
}

impl Drop for ExitWatch {
    fn drop(&mut self) {
        self.request_kill();
    }
}
