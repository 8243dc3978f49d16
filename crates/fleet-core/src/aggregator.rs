//! Per-workspace accumulation of reconfiguration fragments.
//!
//! A dashboard sends a repository change as five separate messages (remote,
//! branch, date, time, token). Each workspace holds one `FragmentSet`; the
//! message that fills the last empty slot takes the whole set out and yields
//! a `ReconfigureRequest`, leaving the workspace empty for the next round.
//!
//! Transitions: `Collecting(n < 5) → Collecting(n + 1)` and
//! `Collecting(4) → Fired → Collecting(0)`. There is no terminal state.

use crate::types::{FragmentField, Workspace};
use std::collections::HashMap;

/// The five fragment slots for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSet {
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub token: Option<String>,
}

impl FragmentSet {
    fn slot_mut(&mut self, field: FragmentField) -> &mut Option<String> {
        match field {
            FragmentField::Remote => &mut self.remote,
            FragmentField::Branch => &mut self.branch,
            FragmentField::Date => &mut self.date,
            FragmentField::Time => &mut self.time,
            FragmentField::Token => &mut self.token,
        }
    }

    pub fn get(&self, field: FragmentField) -> Option<&str> {
        match field {
            FragmentField::Remote => self.remote.as_deref(),
            FragmentField::Branch => self.branch.as_deref(),
            FragmentField::Date => self.date.as_deref(),
            FragmentField::Time => self.time.as_deref(),
            FragmentField::Token => self.token.as_deref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        FragmentField::all().iter().all(|f| self.get(*f).is_some())
    }

    pub fn is_empty(&self) -> bool {
        FragmentField::all().iter().all(|f| self.get(*f).is_none())
    }

    /// Convert a complete set into a request. Returns `None` for a partial set.
    fn into_request(self, workspace: Workspace) -> Option<ReconfigureRequest> {
        Some(ReconfigureRequest {
            workspace,
            remote: self.remote?,
            branch: self.branch?,
            date: self.date?,
            time: self.time?,
            token: self.token?,
        })
    }
}

/// A fully assembled reconfiguration, handed to the reconfigurator.
///
/// `date`, `time` and `token` gate completeness only; nothing downstream
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconfigureRequest {
    pub workspace: Workspace,
    pub remote: String,
    pub branch: String,
    pub date: String,
    pub time: String,
    pub token: String,
}

/// Trim whitespace and the quote characters dashboards wrap string payloads in.
pub fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Keyed store of pending fragment sets. Owned by a single message handler;
/// every mutation goes through `&mut self`.
#[derive(Debug, Default)]
pub struct UpdateAggregator {
    pending: HashMap<Workspace, FragmentSet>,
}

impl UpdateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one fragment. When it completes the workspace's set, the set is
    /// removed and returned as a request.
    pub fn receive(
        &mut self,
        workspace: Workspace,
        field: FragmentField,
        value: &str,
    ) -> Option<ReconfigureRequest> {
        let set = self.pending.entry(workspace).or_default();
        *set.slot_mut(field) = Some(strip_quotes(value).to_string());

        if !set.is_complete() {
            return None;
        }
        self.pending
            .remove(&workspace)
            .and_then(|set| set.into_request(workspace))
    }

    pub fn is_complete(&self, workspace: Workspace) -> bool {
        self.pending
            .get(&workspace)
            .is_some_and(FragmentSet::is_complete)
    }

    pub fn pending(&self, workspace: Workspace) -> Option<&FragmentSet> {
        self.pending.get(&workspace).filter(|s| !s.is_empty())
    }
}
