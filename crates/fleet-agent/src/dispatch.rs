//! Sequential handling of inbound control-channel messages.
//!
//! One `MessageHandler` owns all listener state. Messages are processed one at
//! a time in arrival order, so the aggregator needs no lock and a
//! reconfiguration finishes before the next fragment is looked at.

use crate::broker::{InboundMessage, Publisher};
use crate::reconfigure::Reconfigurator;
use crate::relay::CommandRelay;
use fleet_core::aggregator::UpdateAggregator;
use fleet_core::config::Config;
use fleet_core::status_cache::WorkspaceStatusCache;
use fleet_core::topic::{InboundTopic, TopicRoot};
use fleet_core::types::{FragmentField, Workspace};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Unrecognized,
    NotUtf8,
    Status {
        workspace: Workspace,
        changed: bool,
    },
    Fragment {
        workspace: Workspace,
        field: FragmentField,
    },
    Applied {
        workspace: Workspace,
    },
    Rejected {
        workspace: Workspace,
        reason: String,
    },
    NoDirectory {
        workspace: Workspace,
    },
    Command {
        output: Option<String>,
    },
}

pub struct MessageHandler {
    topics: TopicRoot,
    workspace_dirs: HashMap<Workspace, PathBuf>,
    aggregator: UpdateAggregator,
    status: WorkspaceStatusCache,
    reconfigurator: Reconfigurator,
    relay: CommandRelay,
    publisher: Arc<dyn Publisher>,
}

impl MessageHandler {
    pub fn new(
        topics: TopicRoot,
        workspace_dirs: HashMap<Workspace, PathBuf>,
        reconfigurator: Reconfigurator,
        relay: CommandRelay,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            topics,
            workspace_dirs,
            aggregator: UpdateAggregator::new(),
            status: WorkspaceStatusCache::new(),
            reconfigurator,
            relay,
            publisher,
        }
    }

    /// Handler wired to the system `git` and the configured relay policy.
    pub fn from_config(config: &Config, topics: TopicRoot, publisher: Arc<dyn Publisher>) -> Self {
        let workspace_dirs = Workspace::all()
            .iter()
            .filter_map(|ws| config.workspace_dir(*ws).map(|d| (*ws, d.to_path_buf())))
            .collect();
        Self::new(
            topics,
            workspace_dirs,
            Reconfigurator::system(config.process_timeout()),
            CommandRelay::new(config.command_relay.clone()),
            publisher,
        )
    }

    pub fn aggregator(&self) -> &UpdateAggregator {
        &self.aggregator
    }

    /// Handle messages until the sender side closes.
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<InboundMessage>) {
        while let Some(msg) = inbound.recv().await {
            self.handle(&msg.topic, &msg.payload).await;
        }
        tracing::debug!("inbound channel closed");
    }

    pub async fn handle(&mut self, topic: &str, payload: &[u8]) -> Dispatched {
        let Ok(payload) = std::str::from_utf8(payload) else {
            tracing::warn!(%topic, "dropping message with non-UTF-8 payload");
            return Dispatched::NotUtf8;
        };

        match self.topics.parse_inbound(topic) {
            InboundTopic::WorkspaceStatus { workspace, action } => {
                let changed = self.status.update(workspace, action, payload.trim());
                if changed {
                    tracing::info!(%workspace, status = %payload.trim(), "workspace status");
                }
                Dispatched::Status { workspace, changed }
            }
            InboundTopic::Fragment { workspace, field } => {
                tracing::debug!(%workspace, %field, "update fragment");
                match self.aggregator.receive(workspace, field, payload) {
                    Some(request) => self.reconfigure(workspace, &request.remote, &request.branch).await,
                    None => Dispatched::Fragment { workspace, field },
                }
            }
            InboundTopic::CommandRequest => self.relay_command(payload).await,
            InboundTopic::Unrecognized => {
                tracing::debug!(%topic, "ignoring message on unhandled topic");
                Dispatched::Unrecognized
            }
        }
    }

    async fn reconfigure(&self, workspace: Workspace, remote: &str, branch: &str) -> Dispatched {
        let Some(dir) = self.workspace_dirs.get(&workspace) else {
            tracing::warn!(%workspace, "update received for a workspace with no configured dir; dropped");
            return Dispatched::NoDirectory { workspace };
        };
        match self.reconfigurator.apply(dir, remote, branch).await {
            Ok(()) => Dispatched::Applied { workspace },
            Err(e) => {
                tracing::warn!(%workspace, "reconfiguration failed: {e}");
                Dispatched::Rejected {
                    workspace,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn relay_command(&self, payload: &str) -> Dispatched {
        let output = match self.relay.execute(payload).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("command relay: {e}");
                return Dispatched::Command { output: None };
            }
        };
        let topic = self.topics.command_result();
        if let Err(e) = self.publisher.publish(&topic, output.clone(), false).await {
            tracing::warn!("{e}");
        }
        Dispatched::Command {
            output: Some(output),
        }
    }
}
