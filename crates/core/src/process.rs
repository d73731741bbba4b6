//! External process execution
//!
//! Every SDK tool invocation goes through a [`CommandRunner`], so the
//! installer and the AVD manager can be exercised without an Android SDK.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Number of trailing stderr lines kept in failure messages
const STDERR_TAIL_LINES: usize = 20;

/// A fully described external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Text written to the tool's stdin, then stdin is closed
    pub stdin: Option<String>,
    pub env: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            env: Vec::new(),
        }
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

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// File name of the program, used in log and error messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following `flag`, e.g. `--abi` -> `google_apis/x86_64`
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == ';') {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// External tool failures
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {}{}", format_code(code), format_stderr(stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

fn format_stderr(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.trim())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Runs external tools to completion
pub trait CommandRunner: Send + Sync {
    /// Run `command`, failing on spawn errors and non-zero exit status
    fn run(
        &self,
        command: &ToolCommand,
    ) -> impl Future<Output = Result<ToolOutput, ProcessError>> + Send;
}

/// Runs tools as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessError> {
        let program = command.program_name();
        debug!("Running: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

        // stdin is written from its own task while output is collected
        if let (Some(input), Some(mut stdin)) = (command.stdin.clone(), child.stdin.take()) {
            let name = program.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    // the tool may exit before consuming every answer
                    debug!("{} closed stdin early: {}", name, e);
                }
            });
        }

        let output = child.wait_with_output().await.map_err(|source| ProcessError::Io {
            program: program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{}: {}", program, line);
        }

        if !output.status.success() {
            warn!("{} exited with {:?}", program, output.status.code());
            return Err(ProcessError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: stderr_tail(&stderr),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Locate an SDK command-line tool such as `sdkmanager` or `avdmanager`.
///
/// Looks in `cmdline-tools/latest/bin`, any versioned `cmdline-tools/*/bin`,
/// the legacy `tools/bin`, then `PATH`. Falls back to the bare name so the
/// spawn error names the missing tool.
pub fn locate_sdk_tool(sdk_root: &Path, name: &str) -> PathBuf {
    let exe_name = if cfg!(windows) {
        format!("{}.bat", name)
    } else {
        name.to_string()
    };

    let cmdline_tools = sdk_root.join("cmdline-tools");
    let latest = cmdline_tools.join("latest").join("bin").join(&exe_name);
    if latest.exists() {
        return latest;
    }

    if let Ok(entries) = std::fs::read_dir(&cmdline_tools) {
        for entry in entries.flatten() {
            let path = entry.path().join("bin").join(&exe_name);
            if path.exists() {
                return path;
            }
        }
    }

    let legacy = sdk_root.join("tools").join("bin").join(&exe_name);
    if legacy.exists() {
        return legacy;
    }

    which::which(&exe_name).unwrap_or_else(|_| PathBuf::from(exe_name))
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    //! In-memory runner for tests

    use super::*;
    use parking_lot::Mutex;

    /// Records every invocation instead of running it
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<ToolCommand>>,
        fail_on: Option<String>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail, with exit code 1, any command whose rendered line contains `needle`
        pub fn failing_on(needle: impl Into<String>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: Some(needle.into()),
            }
        }

        pub fn calls(&self) -> Vec<ToolCommand> {
            self.calls.lock().clone()
        }

        /// Rendered command lines, in invocation order
        pub fn command_lines(&self) -> Vec<String> {
            self.calls.lock().iter().map(ToString::to_string).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessError> {
            self.calls.lock().push(command.clone());
            let line = command.to_string();
            match &self.fail_on {
                Some(needle) if line.contains(needle.as_str()) => Err(ProcessError::Failed {
                    command: line,
                    code: Some(1),
                    stderr: "simulated failure".to_string(),
                }),
                _ => Ok(ToolOutput::default()),
            }
        }
    }
}
