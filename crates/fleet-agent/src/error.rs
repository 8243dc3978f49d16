use fleet_core::ValidationError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to run an external command to completion.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("wait failed for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A reconfiguration that was refused or stopped part way.
#[derive(Debug, Error)]
pub enum ReconfigureError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("git {step} failed in {}: {detail}", .dir.display())]
    Step {
        step: &'static str,
        dir: PathBuf,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("command relay is disabled")]
    Disabled,

    #[error("empty command")]
    Empty,

    #[error("command not in allow list: {0}")]
    NotAllowed(String),

    #[error("command exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("publish to '{topic}' failed: {detail}")]
    Publish { topic: String, detail: String },

    #[error("subscribe to '{topic}' failed: {detail}")]
    Subscribe { topic: String, detail: String },
}
