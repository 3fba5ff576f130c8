//! Subprocess execution seam.
//!
//! Stages describe the process they need as a [`CommandSpec`] and hand it to a
//! [`CommandRunner`]. [`LocalRunner`] runs it on this host; tests substitute a
//! recording runner.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::utils::shell;

/// A single process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Written to stdin, which is then closed.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// `sh -c <script>`. The script must be POSIX shell.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").args(["-c".to_string(), script.into()])
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Shell-quoted rendering for logs and error details.
    pub fn display(&self) -> String {
        let mut parts = vec![shell::quote_arg(&self.program)];
        parts.extend(self.args.iter().map(|a| shell::quote_arg(a)));
        parts.join(" ")
    }
}

/// Captured result of a finished process.
///
/// Spawn failures are folded in as `success: false, exit_code: -1` with the
/// OS error on stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> CommandOutput;
}

/// Runs commands as local child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env);

        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return CommandOutput::failure(-1, format!("Command error: {}", e)),
        };

        if let (Some(input), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            // A tool that exits without reading its prompt closes the pipe early.
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    eprintln!("[exec] Failed to write stdin: {}", e);
                }
            }
        }

        match child.wait_with_output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::failure(-1, format!("Command error: {}", e)),
        }
    }
}
