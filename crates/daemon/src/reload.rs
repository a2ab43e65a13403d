//! Hooks that ask the host application to reload after a batch.

use ::core::fmt;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use logging::trace_session;
use tokio::process::Command;
use tracing::warn;

/// Relative location of the reload script inside the host's storage.
pub const RELOAD_SCRIPT_RELATIVE_PATH: &str = "internal/livesync.js";

/// Asks the host to re-run its entry script.
///
/// Called once per successful batch. Implementations must return promptly;
/// anything long-running belongs on another task or process.
pub trait ReloadTrigger: Send + Sync + 'static {
    /// Requests execution of the script at `script`.
    fn run_script(&self, script: &Path);
}

/// Adapts a closure into a [`ReloadTrigger`].
pub struct FnReloadTrigger<F>(F);

impl<F> FnReloadTrigger<F>
where
    F: Fn(&Path) + Send + Sync + 'static,
{
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ReloadTrigger for FnReloadTrigger<F>
where
    F: Fn(&Path) + Send + Sync + 'static,
{
    fn run_script(&self, script: &Path) {
        (self.0)(script);
    }
}

impl<F> fmt::Debug for FnReloadTrigger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnReloadTrigger")
    }
}

/// Only logs the reload request.
///
/// Useful when the host watches the sandbox itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReloadTrigger;

impl ReloadTrigger for LogReloadTrigger {
    fn run_script(&self, script: &Path) {
        trace_session!(script = %script.display(), "reload requested");
    }
}

/// Spawns a host command with the script path as its last argument.
///
/// The child is not waited for; a failure to spawn is logged.
#[derive(Clone, Debug)]
pub struct CommandReloadTrigger {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandReloadTrigger {
    /// Runs `program` with no leading arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds arguments placed before the script path.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns the program that is spawned.
    #[must_use]
    pub fn program(&self) -> &OsString {
        &self.program
    }

    fn command(&self, script: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .kill_on_drop(false);
        command
    }
}

impl ReloadTrigger for CommandReloadTrigger {
    fn run_script(&self, script: &Path) {
        match self.command(script).spawn() {
            Ok(child) => trace_session!(
                pid = child.id(),
                script = %script.display(),
                "reload command started"
            ),
            Err(error) => warn!(
                target: "livesync::session",
                program = ?self.program,
                %error,
                "failed to start reload command"
            ),
        }
    }
}
