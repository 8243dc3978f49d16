use crate::error::{FleetError, Result};
use crate::topic::check_segment;
use crate::types::{ActionSpec, EntityDescriptor, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityConfig / WorkspaceDashboard
// ---------------------------------------------------------------------------

/// A tracked directory (or the robot-wide `meta` entry) and the actions
/// sampled for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_ws: Option<EntityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_ws: Option<EntityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_ws: Option<EntityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EntityConfig>,
}

impl WorkspaceDashboard {
    pub fn get(&self, workspace: Workspace) -> Option<&EntityConfig> {
        match workspace {
            Workspace::RobotWs => self.robot_ws.as_ref(),
            Workspace::ResearchWs => self.research_ws.as_ref(),
            Workspace::DashboardWs => self.dashboard_ws.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionRate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRate {
    #[serde(default = "default_hz")]
    pub hz: f64,
}

fn default_hz() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// PublishConfig
// ---------------------------------------------------------------------------

/// Broker settings from the file. Environment variables take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttConfig>,
}

// ---------------------------------------------------------------------------
// RelayPolicy
// ---------------------------------------------------------------------------

/// Gate for the remote shell-command relay.
///
/// An empty `allow` list means any command is run. With a non-empty list a
/// command must start with an allowed word and contain no shell
/// metacharacters, so a permitted prefix cannot chain a second command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayPolicy {
    #[serde(default = "default_relay_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_relay_enabled() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            enabled: default_relay_enabled(),
            allow: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl RelayPolicy {
    pub fn permits(&self, command: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        if command.contains(SHELL_METACHARACTERS) {
            return false;
        }
        let command = command.trim_start();
        self.allow.iter().any(|prefix| {
            command == prefix
                || command
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

/// Characters that let `sh -c` run more than the allowed command.
const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '$', '`', '(', ')', '<', '>', '\n', '\r'];

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

/// One (entity, action) pair the publisher samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub entity: EntityDescriptor,
    pub action: ActionSpec,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace_dashboard: WorkspaceDashboard,
    #[serde(default)]
    pub repositories: BTreeMap<String, EntityConfig>,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishConfig>,
    #[serde(default)]
    pub command_relay: RelayPolicy,
    #[serde(default = "default_timeout_seconds")]
    pub process_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dashboard: WorkspaceDashboard::default(),
            repositories: BTreeMap::new(),
            actions: BTreeMap::new(),
            publish: None,
            command_relay: RelayPolicy::default(),
            process_timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FleetError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // An empty file deserializes to null; treat it as an empty config.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn mqtt(&self) -> Option<&MqttConfig> {
        self.publish.as_ref().and_then(|p| p.mqtt.as_ref())
    }

    pub fn workspace_dir(&self, workspace: Workspace) -> Option<&Path> {
        self.workspace_dashboard
            .get(workspace)
            .and_then(|w| w.dir.as_deref())
    }

    /// Rate for `name`; actions without an entry run at 1 Hz.
    pub fn action_spec(&self, name: &str) -> ActionSpec {
        let hz = self.actions.get(name).map(|a| a.hz).unwrap_or_else(default_hz);
        ActionSpec::new(name, hz)
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_seconds.max(1))
    }

    /// Every configured (entity, action) pair: workspaces in fixed order,
    /// then `meta`, then repositories by name.
    pub fn schedule(&self) -> Vec<ScheduleEntry> {
        let mut entries = Vec::new();

        for ws in Workspace::all() {
            if let Some(cfg) = self.workspace_dashboard.get(*ws) {
                let entity = EntityDescriptor::workspace(*ws, cfg.dir.clone());
                self.push_entries(&mut entries, entity, &cfg.actions);
            }
        }

        if let Some(meta) = &self.workspace_dashboard.meta {
            self.push_entries(&mut entries, EntityDescriptor::meta(), &meta.actions);
        }

        for (name, cfg) in &self.repositories {
            let entity = EntityDescriptor::repository(name.clone(), cfg.dir.clone());
            self.push_entries(&mut entries, entity, &cfg.actions);
        }

        entries
    }

    fn push_entries(
        &self,
        entries: &mut Vec<ScheduleEntry>,
        entity: EntityDescriptor,
        actions: &[String],
    ) {
        for name in actions {
            entries.push(ScheduleEntry {
                entity: entity.clone(),
                action: self.action_spec(name),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, known_actions: &[&str]) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Every scheduled action must resolve, and names must be topic-safe.
        for entry in self.schedule() {
            let where_ = format!("{} '{}'", entry.entity.kind.as_str(), entry.entity.name);
            if !known_actions.contains(&entry.action.name.as_str()) {
                warnings.push(ConfigWarning::warning(format!(
                    "unknown action '{}' on {where_} will be skipped",
                    entry.action.name
                )));
            }
            if check_segment(&entry.action.name).is_err() {
                warnings.push(ConfigWarning::error(format!(
                    "action name '{}' on {where_} is not a valid topic level",
                    entry.action.name
                )));
            }
        }
        for name in self.repositories.keys() {
            if check_segment(name).is_err() {
                warnings.push(ConfigWarning::error(format!(
                    "repository name '{name}' is not a valid topic level"
                )));
            }
        }

        // 2. Directory-backed entries need a directory.
        for ws in Workspace::all() {
            if let Some(cfg) = self.workspace_dashboard.get(*ws) {
                if cfg.dir.is_none() {
                    warnings.push(ConfigWarning::warning(format!(
                        "workspace '{ws}' has no dir; its actions will report errors and updates will be dropped"
                    )));
                }
            }
        }
        for (name, cfg) in &self.repositories {
            if cfg.dir.is_none() && !cfg.actions.is_empty() {
                warnings.push(ConfigWarning::warning(format!(
                    "repository '{name}' has actions but no dir"
                )));
            }
        }

        // 3. Rates.
        for (name, rate) in &self.actions {
            if !(rate.hz.is_finite() && rate.hz > 0.0) {
                warnings.push(ConfigWarning::warning(format!(
                    "action '{name}' has hz={} (<= 0); running at 1 Hz",
                    rate.hz
                )));
            }
        }

        // 4. The relay runs broker-supplied strings in a shell.
        if self.command_relay.enabled && self.command_relay.allow.is_empty() {
            warnings.push(ConfigWarning::warning(
                "command_relay is enabled with an empty allow list: any command received on the \
                 command topic will be executed",
            ));
        }
        if self.command_relay.timeout_seconds == 0 {
            warnings.push(ConfigWarning::warning(
                "command_relay.timeout_seconds is 0; relayed commands get 1s",
            ));
        }
        if self.process_timeout_seconds == 0 {
            warnings.push(ConfigWarning::warning(
                "process_timeout_seconds is 0; action commands get 1s",
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    const KNOWN: &[&str] = &[
        "git_status",
        "git_branch",
        "git_remote",
        "robot_name",
        "battery",
        "last_online",
        "ssid",
        "ip",
    ];

    const SAMPLE: &str = r#"
workspace_dashboard:
  robot_ws:
    dir: /home/robot/robot_ws
    actions: [git_status, git_branch, git_remote]
  research_ws:
    dir: /home/robot/research_ws
    actions: [git_status]
  dashboard_ws:
    dir: /home/robot/dashboard_ws
    actions: []
  meta:
    actions: [robot_name, last_online, ip]
repositories:
  planner:
    dir: /home/robot/src/planner
    actions: [git_branch]
  drivers:
    dir: /home/robot/src/drivers
    actions: [git_status]
actions:
  git_status:
    hz: 0.2
  ip:
    hz: 0.0
publish:
  mqtt:
    broker_ip: 10.0.0.2
    broker_port: 1884
    namespace: fleet
"#;

    #[test]
    fn parses_sample_config() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            cfg.workspace_dir(Workspace::RobotWs),
            Some(Path::new("/home/robot/robot_ws"))
        );
        assert_eq!(cfg.repositories.len(), 2);
        let mqtt = cfg.mqtt().unwrap();
        assert_eq!(mqtt.broker_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(mqtt.broker_port, Some(1884));
        assert_eq!(cfg.process_timeout(), Duration::from_secs(30));
        assert!(cfg.command_relay.enabled);
    }

    #[test]
    fn action_rates_default_and_clamp() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.action_spec("git_status").rate_hz, 0.2);
        assert_eq!(cfg.action_spec("git_branch").rate_hz, 1.0);
        assert_eq!(cfg.action_spec("ip").rate_hz, 1.0);
    }

    #[test]
    fn schedule_order_is_workspaces_meta_repositories() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        let names: Vec<(EntityKind, String, String)> = cfg
            .schedule()
            .into_iter()
            .map(|e| (e.entity.kind, e.entity.name, e.action.name))
            .collect();
        let expected = [
            (EntityKind::Workspace, "robot_ws", "git_status"),
            (EntityKind::Workspace, "robot_ws", "git_branch"),
            (EntityKind::Workspace, "robot_ws", "git_remote"),
            (EntityKind::Workspace, "research_ws", "git_status"),
            (EntityKind::Meta, "meta", "robot_name"),
            (EntityKind::Meta, "meta", "last_online"),
            (EntityKind::Meta, "meta", "ip"),
            (EntityKind::Repository, "drivers", "git_status"),
            (EntityKind::Repository, "planner", "git_branch"),
        ];
        assert_eq!(names.len(), expected.len());
        for (got, want) in names.iter().zip(expected.iter()) {
            assert_eq!(got.0, want.0);
            assert_eq!(got.1, want.1);
            assert_eq!(got.2, want.2);
        }
    }

    #[test]
    fn meta_entries_have_no_dir() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        assert!(cfg
            .schedule()
            .iter()
            .filter(|e| e.entity.kind == EntityKind::Meta)
            .all(|e| e.entity.dir.is_none()));
    }

    #[test]
    fn empty_file_is_an_empty_config() {
        let cfg = Config::from_yaml("").unwrap();
        assert!(cfg.schedule().is_empty());
        assert_eq!(cfg.process_timeout_seconds, 30);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, FleetError::ConfigNotFound(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("status_config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.schedule().len(), 9);
    }

    #[test]
    fn validate_flags_unknown_actions_and_rates() {
        let yaml = "workspace_dashboard:\n  meta:\n    actions: [robot_name, teleport]\nactions:\n  robot_name:\n    hz: -1\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate(KNOWN);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("unknown action 'teleport'")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("action 'robot_name' has hz=-1")));
    }

    #[test]
    fn validate_flags_unsafe_names_as_errors() {
        let yaml = "repositories:\n  a/b:\n    dir: /tmp\n    actions: [git_status]\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate(KNOWN);
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("'a/b'")));
    }

    #[test]
    fn validate_flags_workspace_without_dir() {
        let yaml = "workspace_dashboard:\n  robot_ws:\n    actions: [git_status]\ncommand_relay:\n  allow: [ls]\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate(KNOWN);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("workspace 'robot_ws' has no dir"));
    }

    #[test]
    fn validate_flags_unrestricted_relay() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        let warnings = cfg.validate(KNOWN);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("empty allow list")));
    }

    #[test]
    fn relay_policy_matches_whole_words() {
        let policy = RelayPolicy {
            enabled: true,
            allow: vec!["ls".into(), "git status".into()],
            timeout_seconds: 5,
        };
        assert!(policy.permits("ls"));
        assert!(policy.permits("ls -la /tmp"));
        assert!(policy.permits("  git status"));
        assert!(!policy.permits("lsblk"));
        assert!(!policy.permits("rm -rf /"));

        let open = RelayPolicy::default();
        assert!(open.permits("anything at all"));

        let disabled = RelayPolicy {
            enabled: false,
            ..RelayPolicy::default()
        };
        assert!(!disabled.permits("ls"));
    }

    #[test]
    fn allow_list_rejects_chained_commands() {
        let policy = RelayPolicy {
            enabled: true,
            allow: vec!["echo".into()],
            timeout_seconds: 5,
        };
        assert!(policy.permits("echo ok"));
        for chained in [
            "echo ok; touch pwned",
            "echo ok && touch pwned",
            "echo ok | sh",
            "echo $(touch pwned)",
            "echo `touch pwned`",
            "echo ok > /etc/passwd",
            "echo ok\ntouch pwned",
            "echo ok & touch pwned",
        ] {
            assert!(!policy.permits(chained), "{chained:?} should be rejected");
        }

        // Without an allow list the relay is unrestricted by choice.
        assert!(RelayPolicy::default().permits("echo ok; uptime"));
    }

    #[test]
    fn zero_relay_timeout_is_clamped_and_flagged() {
        let yaml = "command_relay:\n  allow: [ls]\n  timeout_seconds: 0\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.command_relay.timeout(), Duration::from_secs(1));

        let warnings = cfg.validate(KNOWN);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message
            .contains("command_relay.timeout_seconds is 0"));
    }
}
