use crate::types::Workspace;
use std::collections::HashMap;

/// Last status string seen per workspace topic. Only used to keep repeated
/// retained deliveries out of the log.
///
/// `dashboard/workspaces/{ws}/{action}` and `dashboard/status/{ws}` are
/// tracked separately (the latter under `None`), so two topics carrying
/// different values for one workspace don't defeat each other's dedup.
#[derive(Debug, Default)]
pub struct WorkspaceStatusCache {
    last: HashMap<(Workspace, Option<String>), String>,
}

impl WorkspaceStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status`; returns true when it differs from the previous value
    /// on the same topic.
    pub fn update(&mut self, workspace: Workspace, action: Option<&str>, status: &str) -> bool {
        let key = (workspace, action.map(str::to_string));
        match self.last.get(&key) {
            Some(prev) if prev == status => false,
            _ => {
                self.last.insert(key, status.to_string());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_changes() {
        let mut cache = WorkspaceStatusCache::new();
        let git = Some("git_status");
        assert!(cache.update(Workspace::RobotWs, git, "up-to-date"));
        assert!(!cache.update(Workspace::RobotWs, git, "up-to-date"));
        assert!(cache.update(Workspace::RobotWs, git, "ahead"));
        assert!(cache.update(Workspace::ResearchWs, git, "ahead"));
        assert!(!cache.update(Workspace::ResearchWs, git, "ahead"));
    }

    #[test]
    fn topics_for_one_workspace_dedup_independently() {
        let mut cache = WorkspaceStatusCache::new();
        assert!(cache.update(Workspace::RobotWs, Some("git_status"), "ahead"));
        assert!(cache.update(Workspace::RobotWs, None, "online"));
        assert!(cache.update(Workspace::RobotWs, Some("git_branch"), "main"));
        assert!(!cache.update(Workspace::RobotWs, Some("git_status"), "ahead"));
        assert!(!cache.update(Workspace::RobotWs, None, "online"));
        assert!(!cache.update(Workspace::RobotWs, Some("git_branch"), "main"));
    }
}
