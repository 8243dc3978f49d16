use anyhow::{anyhow, Context};
use fleet_agent::broker::{BrokerSettings, DEFAULT_HOST, DEFAULT_PORT};
use fleet_core::config::Config;
use fleet_core::topic::{check_segment, TopicRoot};
use std::path::PathBuf;

/// Runtime settings collected from flags and their environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub manufacturer: Option<String>,
    pub serial: Option<String>,
    pub broker_host: Option<String>,
    pub broker_port: Option<u16>,
    pub namespace: Option<String>,
}

impl Settings {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = self.config.as_deref().ok_or_else(|| {
            anyhow!("no config file given (use --config or MRS_FLEET_DASHBOARD_CONFIG_PATH)")
        })?;
        Config::load(path).with_context(|| format!("failed to load config {}", path.display()))
    }

    fn identity(&self) -> anyhow::Result<(&str, &str)> {
        let manufacturer = self
            .manufacturer
            .as_deref()
            .ok_or_else(|| anyhow!("robot manufacturer not set (use --manufacturer or ROBOT_MANUFACTURER)"))?;
        let serial = self
            .serial
            .as_deref()
            .ok_or_else(|| anyhow!("robot serial not set (use --serial or ROBOT_SERIAL_NUMBER)"))?;
        check_segment(manufacturer).context("invalid manufacturer")?;
        check_segment(serial).context("invalid serial number")?;
        Ok((manufacturer, serial))
    }

    /// Topic prefix. The namespace comes from the flag or env, then the config
    /// file, then defaults to empty.
    pub fn topics(&self, config: &Config) -> anyhow::Result<TopicRoot> {
        let (manufacturer, serial) = self.identity()?;
        let namespace = self
            .namespace
            .clone()
            .or_else(|| config.mqtt().and_then(|m| m.namespace.clone()))
            .unwrap_or_default();
        Ok(TopicRoot::new(&namespace, manufacturer, serial))
    }

    pub fn broker(&self, config: &Config) -> anyhow::Result<BrokerSettings> {
        let (manufacturer, serial) = self.identity()?;
        let mqtt = config.mqtt();
        let host = self
            .broker_host
            .clone()
            .or_else(|| mqtt.and_then(|m| m.broker_ip.clone()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = self
            .broker_port
            .or_else(|| mqtt.and_then(|m| m.broker_port))
            .unwrap_or(DEFAULT_PORT);
        Ok(BrokerSettings::new(
            host,
            port,
            format!("fleet-agent-{manufacturer}-{serial}"),
        ))
    }
}
