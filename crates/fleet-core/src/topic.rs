//! Topic addressing for status publications and the dashboard control channel.
//!
//! Every topic lives under `{namespace}/{manufacturer}/{robot_id}`. Outbound
//! status topics are `{group}/{entity}/{action}`; inbound control topics are
//! parsed structurally after the robot prefix is stripped, never by substring.

use crate::error::{FleetError, Result};
use crate::types::{ActionSpec, EntityDescriptor, FragmentField, Workspace};

pub const COMMAND_REQUEST: &str = "dashboard/updates/command/command";
pub const COMMAND_RESULT: &str = "dashboard/updates/command/result";

/// The per-robot prefix every topic hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoot {
    prefix: String,
}

impl TopicRoot {
    pub fn new(namespace: &str, manufacturer: &str, robot_id: &str) -> Self {
        let ns = namespace.trim_end_matches('/');
        Self {
            prefix: format!("{ns}/{manufacturer}/{robot_id}"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Join a relative path (no leading slash) onto the robot prefix.
    pub fn join(&self, rel: &str) -> String {
        format!("{}/{rel}", self.prefix)
    }

    /// Retained status topic for an (entity, action) pair.
    pub fn status(&self, entity: &EntityDescriptor, action: &ActionSpec) -> String {
        self.join(&format!(
            "{}/{}/{}",
            entity.kind.group(),
            entity.name,
            action.name
        ))
    }

    pub fn fragment(&self, workspace: Workspace, field: FragmentField) -> String {
        self.join(&format!("dashboard/updates/{workspace}/{field}"))
    }

    pub fn command_request(&self) -> String {
        self.join(COMMAND_REQUEST)
    }

    pub fn command_result(&self) -> String {
        self.join(COMMAND_RESULT)
    }

    /// Every topic the listener subscribes to, in subscription order.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = Vec::new();
        for ws in Workspace::all() {
            for field in FragmentField::all() {
                topics.push(self.fragment(*ws, *field));
            }
            topics.push(self.join(&format!("dashboard/status/{ws}")));
            topics.push(self.join(&format!("dashboard/workspaces/{ws}/git_status")));
        }
        topics.push(self.command_request());
        topics
    }

    /// Classify an inbound topic. Topics outside this robot's prefix, or with
    /// a shape the agent does not handle, come back as `Unrecognized`.
    pub fn parse_inbound<'a>(&self, topic: &'a str) -> InboundTopic<'a> {
        let Some(rel) = topic
            .strip_prefix(self.prefix.as_str())
            .and_then(|r| r.strip_prefix('/'))
        else {
            return InboundTopic::Unrecognized;
        };

        let parts: Vec<&str> = rel.split('/').collect();
        match parts.as_slice() {
            ["dashboard", "updates", "command", "command"] => InboundTopic::CommandRequest,
            ["dashboard", "updates", ws, field] => match Workspace::parse(ws) {
                Some(workspace) => match FragmentField::parse(field) {
                    Some(field) => InboundTopic::Fragment { workspace, field },
                    None => InboundTopic::Unrecognized,
                },
                None => InboundTopic::Unrecognized,
            },
            ["dashboard", "workspaces", ws, action] => match Workspace::parse(ws) {
                Some(workspace) => InboundTopic::WorkspaceStatus {
                    workspace,
                    action: Some(*action),
                },
                None => InboundTopic::Unrecognized,
            },
            ["dashboard", "status", ws] => match Workspace::parse(ws) {
                Some(workspace) => InboundTopic::WorkspaceStatus {
                    workspace,
                    action: None,
                },
                None => InboundTopic::Unrecognized,
            },
            _ => InboundTopic::Unrecognized,
        }
    }
}

/// Structural classification of an inbound control-channel topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic<'a> {
    Fragment {
        workspace: Workspace,
        field: FragmentField,
    },
    CommandRequest,
    WorkspaceStatus {
        workspace: Workspace,
        action: Option<&'a str>,
    },
    Unrecognized,
}

/// Entity and action names become topic levels, so they must not carry
/// separators or wildcards.
pub fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains(['/', '+', '#']) {
        return Err(FleetError::InvalidTopicSegment(segment.to_string()));
    }
    Ok(())
}
