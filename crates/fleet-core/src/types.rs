use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// Which sampling function to call and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub rate_hz: f64,
}

impl ActionSpec {
    /// Build a spec, falling back to 1 Hz for non-positive or non-finite rates.
    pub fn new(name: impl Into<String>, rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            1.0
        };
        Self {
            name: name.into(),
            rate_hz,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }
}

// ---------------------------------------------------------------------------
// EntityKind / EntityDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Workspace,
    Meta,
    Repository,
}

impl EntityKind {
    /// Topic group the entity's status is published under.
    pub fn group(&self) -> &'static str {
        match self {
            EntityKind::Workspace => "dashboard/workspaces",
            EntityKind::Meta => "dashboard",
            EntityKind::Repository => "repositories",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Workspace => "workspace",
            EntityKind::Meta => "meta",
            EntityKind::Repository => "repository",
        }
    }
}

/// What is being sampled or acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl EntityDescriptor {
    pub const META_NAME: &'static str = "meta";

    pub fn workspace(workspace: Workspace, dir: Option<PathBuf>) -> Self {
        Self {
            kind: EntityKind::Workspace,
            name: workspace.as_str().to_string(),
            dir,
        }
    }

    pub fn meta() -> Self {
        Self {
            kind: EntityKind::Meta,
            name: Self::META_NAME.to_string(),
            dir: None,
        }
    }

    pub fn repository(name: impl Into<String>, dir: Option<PathBuf>) -> Self {
        Self {
            kind: EntityKind::Repository,
            name: name.into(),
            dir,
        }
    }
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// The fixed set of tracked working copies a dashboard can reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workspace {
    RobotWs,
    ResearchWs,
    DashboardWs,
}

impl Workspace {
    pub fn all() -> &'static [Workspace] {
        &[
            Workspace::RobotWs,
            Workspace::ResearchWs,
            Workspace::DashboardWs,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Workspace::RobotWs => "robot_ws",
            Workspace::ResearchWs => "research_ws",
            Workspace::DashboardWs => "dashboard_ws",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|w| w.as_str() == s)
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FragmentField
// ---------------------------------------------------------------------------

/// One named field of a pending reconfiguration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentField {
    Remote,
    Branch,
    Date,
    Time,
    Token,
}

impl FragmentField {
    pub fn all() -> &'static [FragmentField] {
        &[
            FragmentField::Remote,
            FragmentField::Branch,
            FragmentField::Date,
            FragmentField::Time,
            FragmentField::Token,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentField::Remote => "remote",
            FragmentField::Branch => "branch",
            FragmentField::Date => "date",
            FragmentField::Time => "time",
            FragmentField::Token => "token",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for FragmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_rate_falls_back_to_one_hz() {
        assert_eq!(ActionSpec::new("git_status", 0.0).rate_hz, 1.0);
        assert_eq!(ActionSpec::new("git_status", -3.0).rate_hz, 1.0);
        assert_eq!(ActionSpec::new("git_status", f64::NAN).rate_hz, 1.0);
    }

    #[test]
    fn period_is_inverse_of_rate() {
        let spec = ActionSpec::new("ip", 2.0);
        assert_eq!(spec.period(), Duration::from_millis(500));
        let slow = ActionSpec::new("git_status", 0.2);
        assert_eq!(slow.period(), Duration::from_secs(5));
    }

    #[test]
    fn entity_groups() {
        assert_eq!(EntityKind::Workspace.group(), "dashboard/workspaces");
        assert_eq!(EntityKind::Meta.group(), "dashboard");
        assert_eq!(EntityKind::Repository.group(), "repositories");
    }

    #[test]
    fn workspace_names_parse_back() {
        for ws in Workspace::all() {
            assert_eq!(Workspace::parse(ws.as_str()), Some(*ws));
        }
        assert_eq!(Workspace::parse("command"), None);
    }

    #[test]
    fn fragment_fields_parse_back() {
        for field in FragmentField::all() {
            assert_eq!(FragmentField::parse(field.as_str()), Some(*field));
        }
        assert_eq!(FragmentField::parse("result"), None);
    }
}
