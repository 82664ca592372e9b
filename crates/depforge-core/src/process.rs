//! External tool invocation.
//!
//! Every subprocess depforge starts is described by a [`ToolInvocation`],
//! run to completion through a [`ProcessRunner`], and reported back as a
//! [`ToolOutput`]. A non-zero exit is an ordinary value here; callers decide
//! which exits are failures.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Description of one external process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Executable to run (absolute path or a name resolved through `PATH`).
    pub program: PathBuf,
    /// Arguments, passed through without shell interpretation.
    pub args: Vec<OsString>,
    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
    /// Environment variables set on top of the inherited environment.
    pub env: Vec<(OsString, OsString)>,
}

impl ToolInvocation {
    /// Start describing an invocation of `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run in `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Look up an environment override set on this invocation.
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Arguments as lossy UTF-8, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Single-line rendering for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.args_lossy() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Captured standard error, lossily decoded as UTF-8.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external processes to completion.
pub trait ProcessRunner: Send + Sync {
    /// Spawn `invocation`, wait for it to exit and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error only when the process could not be started or its
    /// output could not be collected. A non-zero exit is reported through
    /// [`ToolOutput::exit_code`].
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
        (**self).run(invocation)
    }
}

/// [`ProcessRunner`] backed by `std::process`.
///
/// Stdout and stderr are both piped and drained concurrently before the exit
/// status is read, so a chatty child cannot fill a pipe buffer and stall.
/// There is no timeout: a hung tool blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
        debug!(command = %invocation.display(), cwd = ?invocation.cwd, "spawning");
        let output = invocation.to_command().output()?;
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, program = %invocation.program.display(), "process exited");
        Ok(ToolOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Build a search path with `dirs` in front of `base`.
///
/// Uses the platform separator (`:` on Unix, `;` on Windows). Entries that
/// cannot be joined (e.g. containing the separator) are dropped.
pub fn prepend_search_path(dirs: &[&Path], base: Option<&OsStr>) -> OsString {
    let mut entries: Vec<PathBuf> = dirs.iter().map(|d| d.to_path_buf()).collect();
    if let Some(base) = base {
        entries.extend(std::env::split_paths(base));
    }
    std::env::join_paths(entries.iter()).unwrap_or_else(|_| {
        let valid: Vec<&PathBuf> = entries
            .iter()
            .filter(|p| std::env::join_paths(std::iter::once(p)).is_ok())
            .collect();
        std::env::join_paths(valid).unwrap_or_default()
    })
}
