//! Sampling actions and the registry that maps their names to functions.
//!
//! An action never fails outward: every problem (missing directory, git
//! error, timeout) becomes the string that gets published, so a broken
//! sampler shows up on the dashboard instead of disappearing.

use crate::process::{self, ProcessOutput};
use fleet_core::git_output;
use fleet_core::types::EntityDescriptor;
use fleet_core::FleetError;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::time::Duration;

/// A sampling function: entity in, status string out, bounded by `timeout`.
pub type ActionFn = for<'a> fn(&'a EntityDescriptor, Duration) -> BoxFuture<'a, String>;

/// Returned in place of a sample when the entity's directory is missing.
pub const CONFIG_DIR_ERROR: &str = "Config DIR Error";

pub const DEFAULT_ROBOT_NAME: &str = "default_robot";

#[derive(Clone)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionFn>,
}

impl ActionRegistry {
    pub fn empty() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    /// Registry with every built-in action.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("git_status", git_status);
        registry.register("git_branch", git_branch);
        registry.register("git_remote", git_remote);
        registry.register("robot_name", robot_name);
        registry.register("battery", battery);
        registry.register("last_online", last_online);
        registry.register("ssid", ssid);
        registry.register("ip", ip);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, action: ActionFn) {
        self.actions.insert(name.into(), action);
    }

    pub fn resolve(&self, name: &str) -> Result<ActionFn, FleetError> {
        self.actions
            .get(name)
            .copied()
            .ok_or_else(|| FleetError::UnknownAction(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// git actions
// ---------------------------------------------------------------------------

/// Run git in the entity's directory. `Err` carries the string to publish.
async fn git(entity: &EntityDescriptor, args: &[&str], timeout: Duration) -> Result<String, String> {
    let dir = match entity.dir.as_deref() {
        Some(dir) if dir.is_dir() => dir,
        _ => {
            tracing::debug!(entity = %entity.name, dir = ?entity.dir, "configured directory is missing");
            return Err(CONFIG_DIR_ERROR.to_string());
        }
    };

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("git");
    argv.extend_from_slice(args);

    match process::run(&argv, Some(dir), timeout).await {
        Ok(ProcessOutput {
            code: Some(0),
            stdout,
            ..
        }) => Ok(stdout),
        Ok(out) => Err(format!("Error: {}", out.stderr.trim())),
        Err(e) => Err(format!("Exception: {e}")),
    }
}

fn git_status(entity: &EntityDescriptor, timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async move {
        match git(entity, &["status"], timeout).await {
            Ok(out) => git_output::summarize_status(&out),
            Err(msg) => msg,
        }
    })
}

fn git_branch(entity: &EntityDescriptor, timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async move {
        match git(entity, &["branch"], timeout).await {
            Ok(out) => git_output::current_branch(&out)
                .unwrap_or_else(|| "Error: no checked-out branch".to_string()),
            Err(msg) => msg,
        }
    })
}

fn git_remote(entity: &EntityDescriptor, timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async move {
        let status = match git(entity, &["status"], timeout).await {
            Ok(out) => out,
            Err(msg) => return msg,
        };
        let Some(remote) = git_output::tracking_remote(&status) else {
            return "Error: branch has no upstream".to_string();
        };
        match git(entity, &["remote", "-v"], timeout).await {
            Ok(out) => git_output::remote_fetch_url(&out, &remote)
                .unwrap_or_else(|| format!("Error: no fetch url for remote '{remote}'")),
            Err(msg) => msg,
        }
    })
}

// ---------------------------------------------------------------------------
// robot-wide actions
// ---------------------------------------------------------------------------

fn robot_name(_entity: &EntityDescriptor, _timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async {
        std::env::var("ROBOT_NAME").unwrap_or_else(|_| DEFAULT_ROBOT_NAME.to_string())
    })
}

/// No battery source yet; publishes an empty value so the topic exists.
fn battery(_entity: &EntityDescriptor, _timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async { String::new() })
}

fn last_online(_entity: &EntityDescriptor, _timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async { chrono::Local::now().format("%d-%b-%Y %H:%M").to_string() })
}

/// Run a host tool and return trimmed stdout, or an empty string if it is
/// missing or fails.
async fn host_tool(argv: &[&str], timeout: Duration) -> String {
    if which::which(argv[0]).is_err() {
        return String::new();
    }
    match process::run(argv, None, timeout).await {
        Ok(out) if out.success() => out.stdout.trim().to_string(),
        Ok(out) => {
            tracing::debug!(tool = argv[0], detail = %out.failure_detail(), "host tool failed");
            String::new()
        }
        Err(e) => {
            tracing::debug!(tool = argv[0], error = %e, "host tool failed");
            String::new()
        }
    }
}

fn ssid(_entity: &EntityDescriptor, timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async move { host_tool(&["iwgetid", "-r"], timeout).await })
}

fn ip(_entity: &EntityDescriptor, timeout: Duration) -> BoxFuture<'_, String> {
    Box::pin(async move {
        let addrs = host_tool(&["hostname", "-I"], timeout).await;
        addrs.split(' ').next().unwrap_or_default().to_string()
    })
}
