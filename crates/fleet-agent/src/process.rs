//! Bounded subprocess execution shared by actions, the reconfigurator and the
//! command relay.
//!
//! Every call captures stdout and stderr and is wrapped in a timeout. The
//! child is spawned with `kill_on_drop`, so when the timeout fires and the
//! wait future is dropped the process is killed rather than left running.

use crate::error::ProcessError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default bound for sampling and git subprocesses.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Short description of a failed run for logs and error strings.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        let code = self
            .code
            .map(|c| format!("exit {c}"))
            .unwrap_or_else(|| "killed by signal".to_string());
        if stderr.is_empty() {
            code
        } else {
            format!("{code}: {}", tail(stderr, 2048))
        }
    }
}

/// Run `argv` with an optional working directory, waiting at most `timeout`.
pub async fn run(
    argv: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ProcessError::Wait {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    Ok(ProcessOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run `command` through `sh -c`.
pub async fn run_shell(
    command: &str,
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    run(&["sh", "-c", command], cwd, timeout).await
}

/// Keep at most the last `max` bytes of `s`, cut on a char boundary.
pub fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
