//! Remote shell commands received on the command topic.

use crate::error::RelayError;
use crate::process;
use fleet_core::aggregator::strip_quotes;
use fleet_core::config::RelayPolicy;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CommandRelay {
    policy: RelayPolicy,
    cwd: Option<PathBuf>,
}

impl CommandRelay {
    /// Relay that runs commands from the user's home directory.
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            policy,
            cwd: home::home_dir(),
        }
    }

    pub fn with_cwd(policy: RelayPolicy, cwd: Option<PathBuf>) -> Self {
        Self { policy, cwd }
    }

    /// Run `payload` through `sh -c` and return its trimmed stdout.
    pub async fn execute(&self, payload: &str) -> Result<String, RelayError> {
        if !self.policy.enabled {
            return Err(RelayError::Disabled);
        }
        let command = strip_quotes(payload);
        if command.is_empty() {
            return Err(RelayError::Empty);
        }
        if !self.policy.permits(command) {
            return Err(RelayError::NotAllowed(command.to_string()));
        }

        tracing::info!(%command, "running relayed command");
        let out = process::run_shell(command, self.cwd.as_deref(), self.policy.timeout()).await?;
        if !out.success() {
            return Err(RelayError::Failed {
                code: out.code,
                stderr: process::tail(out.stderr.trim(), 2048).to_string(),
            });
        }
        Ok(out.stdout.trim().to_string())
    }
}
