//! Working directory scaffolding.
//!
//! The backend serves an application directory; the harness gives it a
//! minimal one in a private temporary directory.

use std::{fs, io};

use tempfile::TempDir;

pub const MANIFEST_FILE: &str = "app.yaml";
pub const STUB_FILE: &str = "stubapp.go";

const STUB_SOURCE: &str = "
package nihilist

func init() {}
";

/// Render the application manifest.
#[must_use]
pub fn manifest(app_id: &str) -> String {
    format!(
        "
application: {app_id}
version: 1
runtime: go
api_version: go1

handlers:
- url: /.*
  script: _go_app
"
    )
}

/// Create a private directory holding the manifest and stub program.
///
/// The directory is removed again if writing either file fails.
///
/// # Errors
/// Returns error if the directory or either file cannot be created.
pub fn create_app_dir(app_id: &str) -> io::Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("harness-").tempdir()?;
    fs::write(dir.path().join(MANIFEST_FILE), manifest(app_id))?;
    fs::write(dir.path().join(STUB_FILE), STUB_SOURCE)?;
    tracing::debug!(dir = %dir.path().display(), "Created application directory");
    Ok(dir)
}
