//! Point a working copy at a dashboard-supplied remote and branch.

use crate::error::{ProcessError, ReconfigureError};
use crate::process::{self, ProcessOutput};
use async_trait::async_trait;
use fleet_core::validate::{check_branch_name, check_remote_url};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Remote alias the dashboard's repository is registered under.
pub const REMOTE_ALIAS: &str = "dashboard";

/// Runs one git invocation in a working copy.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn git(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput, ProcessError>;
}

/// The `git` on `PATH`, bounded by a per-call timeout.
#[derive(Debug, Clone)]
pub struct SystemGit {
    pub timeout: Duration,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            timeout: process::DEFAULT_TIMEOUT,
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn git(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput, ProcessError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("git");
        argv.extend_from_slice(args);
        process::run(&argv, Some(dir), self.timeout).await
    }
}

#[derive(Clone)]
pub struct Reconfigurator {
    git: Arc<dyn GitRunner>,
}

impl Reconfigurator {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self { git }
    }

    pub fn system(timeout: Duration) -> Self {
        Self::new(Arc::new(SystemGit { timeout }))
    }

    /// Validate `remote` and `branch`, then add (or repoint) the `dashboard`
    /// remote, fetch it, and force-checkout `branch` from it.
    ///
    /// Nothing runs if validation fails. The first failing step aborts the
    /// rest; earlier steps are not rolled back.
    pub async fn apply(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), ReconfigureError> {
        check_remote_url(remote)?;
        check_branch_name(branch)?;

        tracing::info!(dir = %dir.display(), %remote, %branch, "reconfiguring working copy");

        let added = self.step(dir, "remote add", &["remote", "add", REMOTE_ALIAS, remote]).await;
        match added {
            Ok(()) => {}
            Err(ReconfigureError::Step { ref detail, .. }) if detail.contains("already exists") => {
                self.step(dir, "remote set-url", &["remote", "set-url", REMOTE_ALIAS, remote])
                    .await?;
            }
            Err(e) => return Err(e),
        }

        self.step(dir, "fetch", &["fetch", REMOTE_ALIAS]).await?;

        let upstream = format!("{REMOTE_ALIAS}/{branch}");
        self.step(dir, "checkout", &["checkout", "-B", branch, &upstream])
            .await?;

        tracing::info!(dir = %dir.display(), %branch, "working copy reconfigured");
        Ok(())
    }

    async fn step(&self, dir: &Path, step: &'static str, args: &[&str]) -> Result<(), ReconfigureError> {
        let failed = |detail: String| ReconfigureError::Step {
            step,
            dir: dir.to_path_buf(),
            detail,
        };
        match self.git.git(dir, args).await {
            Ok(out) if out.success() => Ok(()),
            Ok(out) => Err(failed(out.failure_detail())),
            Err(e) => Err(failed(e.to_string())),
        }
    }
}
