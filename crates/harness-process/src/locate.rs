//! Locating the interpreter and the backend executable.

use std::path::{Path, PathBuf};

use crate::ProcessError;

/// The two binaries that make up the backend command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binaries {
    pub interpreter: PathBuf,
    pub executable: PathBuf,
}

/// Resolve an executable by name.
///
/// The search order is:
/// 1. Explicit paths (absolute or containing a separator).
/// 2. The current process PATH via `which`.
pub async fn resolve_executable_path(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }

    let path = Path::new(executable);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    which_async(executable).await
}

/// Find the first interpreter in `candidates` present on `PATH`.
///
/// # Errors
/// Returns `InterpreterNotFound` naming every candidate tried.
pub async fn find_interpreter(candidates: &[String]) -> Result<PathBuf, ProcessError> {
    for name in candidates {
        if let Some(found) = resolve_executable_path(name).await {
            tracing::debug!(interpreter = %found.display(), "Found interpreter");
            return Ok(found);
        }
    }
    Err(ProcessError::InterpreterNotFound(candidates.join(", ")))
}

/// Find the backend executable.
///
/// An explicit path wins, then the `override_var` environment variable,
/// then a `PATH` search for `name`. An override that points nowhere is an
/// error rather than a reason to fall back.
///
/// # Errors
/// Returns `InvalidOverride` or `ExecutableNotFound`.
pub async fn find_executable(
    explicit: Option<&Path>,
    override_var: &str,
    name: &str,
) -> Result<PathBuf, ProcessError> {
    let (origin, path) = if let Some(path) = explicit {
        ("executable override".to_string(), path.to_path_buf())
    } else if let Some(value) = std::env::var_os(override_var).filter(|v| !v.is_empty()) {
        (format!("{override_var} environment variable"), PathBuf::from(value))
    } else {
        return resolve_executable_path(name)
            .await
            .ok_or_else(|| ProcessError::ExecutableNotFound(name.to_string()));
    };

    if path.exists() {
        Ok(path)
    } else {
        Err(ProcessError::InvalidOverride { origin, path })
    }
}

async fn which_async(executable: &str) -> Option<PathBuf> {
    let executable = executable.to_string();
    tokio::task::spawn_blocking(move || which::which(executable))
        .await
        .ok()
        .and_then(Result::ok)
}
