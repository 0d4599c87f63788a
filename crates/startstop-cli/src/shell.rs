//! Shell-command step actions.
//!
//! A `ShellCommand` runs `sh -c <command>` to completion. A non-zero exit is
//! reported as a `ShellError` carrying the exit code and the last lines of
//! stderr, which becomes the step's error.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use startstop_types::StepError;

/// Lines of output kept in logs and exit errors.
const TAIL_LINES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    Exited {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Last `max_lines` non-blank lines of `output`, joined with `" | "`.
fn tail(output: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(output);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].join(" | ")
}

#[derive(Debug, Clone)]
pub struct ShellCommand {
    command: String,
    workdir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            workdir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn workdir(mut self, workdir: Option<PathBuf>) -> Self {
        self.workdir = workdir;
        self
    }

    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Run the command and wait for it to exit.
    pub async fn run(&self) -> Result<(), ShellError> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| ShellError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let stdout = tail(&output.stdout, TAIL_LINES);
        if !stdout.is_empty() {
            tracing::debug!(command = %self.command, stdout = %stdout, "command output");
        }

        if output.status.success() {
            return Ok(());
        }
        Err(ShellError::Exited {
            command: self.command.clone(),
            code: output.status.code(),
            stderr: tail(&output.stderr, TAIL_LINES),
        })
    }

    /// Run the command as a step action.
    pub async fn run_step(self) -> Result<(), StepError> {
        self.run().await.map_err(StepError::new)
    }
}
