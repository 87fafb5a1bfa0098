//! Session configuration.

use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use crate::CoreError;

/// Hook run before each backend launch.
///
/// Owned by the embedding application; a failure aborts startup before
/// the child process is spawned.
pub type PrepareHook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Application id used when none is configured.
pub const DEFAULT_APP_ID: &str = "testapp";

/// Environment variable pointing at a specific backend executable.
pub const DEFAULT_OVERRIDE_VAR: &str = "APPENGINE_DEV_APPSERVER";

/// Backend executable searched for on `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "dev_appserver.py";

/// Interpreters probed on `PATH`, in order.
pub const DEFAULT_INTERPRETERS: [&str; 2] = ["python2.7", "python"];

/// How long to wait for both endpoints to be announced.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// How long to wait for the backend to exit after a quit request.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Options used when creating a session.
#[derive(Clone)]
pub struct Options {
    /// Application id. Defaults to `"testapp"`.
    pub app_id: String,
    /// Interpreter names probed on `PATH`, in order.
    pub interpreter_candidates: Vec<String>,
    /// Backend executable name searched for on `PATH`.
    pub executable: String,
    /// Environment variable that overrides the executable location.
    pub override_var: String,
    /// Explicit executable path; takes precedence over `override_var`.
    pub executable_override: Option<PathBuf>,
    /// Arguments appended after the standard launch flags.
    pub extra_args: Vec<String>,
    /// Optional hook run before the backend is launched.
    pub prepare: Option<PrepareHook>,
    pub startup_timeout: Duration,
    pub shutdown_timeout: Duration,
    /// Default timeout for remote calls. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Echo the backend's stderr to the test runner's stderr.
    pub echo_diagnostics: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            interpreter_candidates: DEFAULT_INTERPRETERS.iter().map(ToString::to_string).collect(),
            executable: DEFAULT_EXECUTABLE.to_string(),
            override_var: DEFAULT_OVERRIDE_VAR.to_string(),
            executable_override: None,
            extra_args: Vec::new(),
            prepare: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            call_timeout: None,
            echo_diagnostics: true,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("app_id", &self.app_id)
            .field("interpreter_candidates", &self.interpreter_candidates)
            .field("executable", &self.executable)
            .field("override_var", &self.override_var)
            .field("executable_override", &self.executable_override)
            .field("extra_args", &self.extra_args)
            .field("prepare", &self.prepare.as_ref().map(|_| "<hook>"))
            .field("startup_timeout", &self.startup_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("call_timeout", &self.call_timeout)
            .field("echo_diagnostics", &self.echo_diagnostics)
            .finish()
    }
}

impl Options {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application id. An empty id keeps the default.
    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        let app_id = app_id.into();
        if !app_id.is_empty() {
            self.app_id = app_id;
        }
        self
    }

    /// Fully qualified application id, as the backend reports it.
    #[must_use]
    pub fn fully_qualified_app_id(&self) -> String {
        format!("dev~{}", self.app_id)
    }

    /// Replace the interpreter candidates.
    #[must_use]
    pub fn with_interpreters<I>(mut self, candidates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.interpreter_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Set the executable name searched for on `PATH`.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Set the environment variable consulted for an executable override.
    #[must_use]
    pub fn with_override_var(mut self, var: impl Into<String>) -> Self {
        self.override_var = var.into();
        self
    }

    /// Point at a specific executable, bypassing the environment and `PATH`.
    #[must_use]
    pub fn with_executable_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_override = Some(path.into());
        self
    }

    /// Extend the extra launch arguments.
    #[must_use]
    pub fn with_extra_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Extend the extra launch arguments from a shell-quoted string.
    ///
    /// # Errors
    /// Returns error if the string cannot be split.
    pub fn with_extra_args_str(self, args: &str) -> Result<Self, CoreError> {
        let parts = shlex::split(args).ok_or_else(|| CoreError::InvalidArgs(args.to_string()))?;
        Ok(self.with_extra_args(parts))
    }

    /// Register the preparation hook.
    #[must_use]
    pub fn with_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the default per-call timeout. A zero duration disables it.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout).filter(|d| !d.is_zero());
        self
    }

    #[must_use]
    pub const fn with_echo_diagnostics(mut self, echo: bool) -> Self {
        self.echo_diagnostics = echo;
        self
    }
}
