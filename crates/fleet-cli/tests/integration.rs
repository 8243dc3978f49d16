#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = "\
workspace_dashboard:
  robot_ws:
    dir: /home/robot/robot_ws
    actions: [git_status, git_branch]
  meta:
    actions: [robot_name, ip]
repositories:
  planner:
    dir: /home/robot/src/planner
    actions: [git_remote]
actions:
  git_status:
    hz: 0.5
command_relay:
  allow: [uptime]
";

const ENV_VARS: &[&str] = &[
    "MRS_FLEET_DASHBOARD_CONFIG_PATH",
    "ROBOT_MANUFACTURER",
    "ROBOT_SERIAL_NUMBER",
    "MQTT_BROKER_IP",
    "MQTT_BROKER_PORT",
    "MQTT_BROKER_NS",
];

fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join("status_config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn agent(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fleet-agent").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("MRS_FLEET_DASHBOARD_CONFIG_PATH", config)
        .env("ROBOT_MANUFACTURER", "acme")
        .env("ROBOT_SERIAL_NUMBER", "R-042");
    cmd
}

// ---------------------------------------------------------------------------
// topics
// ---------------------------------------------------------------------------

#[test]
fn topics_lists_status_and_control_topics() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, CONFIG);
    agent(&config)
        .args(["--namespace", "fleet", "topics"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "fleet/acme/R-042/dashboard/workspaces/robot_ws/git_status",
        ))
        .stdout(predicate::str::contains("fleet/acme/R-042/dashboard/meta/ip"))
        .stdout(predicate::str::contains(
            "fleet/acme/R-042/repositories/planner/git_remote",
        ))
        .stdout(predicate::str::contains(
            "fleet/acme/R-042/dashboard/updates/command/command",
        ));
}

#[test]
fn topics_json_is_machine_readable() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, CONFIG);
    let output = agent(&config)
        .env("MQTT_BROKER_NS", "plant")
        .args(["topics", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["prefix"], "plant/acme/R-042");
    // 5 sampled pairs plus the command result topic.
    assert_eq!(value["publish"].as_array().unwrap().len(), 6);
    assert_eq!(value["publish"][0]["hz"], 0.5);
    assert_eq!(value["publish"][5]["retain"], false);
    assert_eq!(value["subscribe"].as_array().unwrap().len(), 22);
}

#[test]
fn topics_requires_robot_identity() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, CONFIG);
    agent(&config)
        .env_remove("ROBOT_SERIAL_NUMBER")
        .arg("topics")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ROBOT_SERIAL_NUMBER"));
}

// ---------------------------------------------------------------------------
// config validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_a_clean_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, CONFIG);
    agent(&config)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn validate_warns_but_succeeds_on_unknown_action() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "workspace_dashboard:\n  meta:\n    actions: [teleport]\ncommand_relay:\n  enabled: false\n",
    );
    agent(&config)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning] unknown action 'teleport'"));
}

#[test]
fn validate_fails_on_unsafe_names() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "repositories:\n  a/b:\n    dir: /tmp\n    actions: [git_status]\n",
    );
    agent(&config)
        .args(["config", "validate", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"level\": \"error\""))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yaml");
    agent(&missing)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
