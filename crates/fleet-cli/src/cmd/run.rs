use crate::settings::Settings;
use fleet_agent::AgentOptions;

/// Which halves of the agent to start.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Both,
    PublishOnly,
    ListenOnly,
}

pub fn run(settings: &Settings, mode: Mode) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    let opts = AgentOptions {
        topics: settings.topics(&config)?,
        broker: settings.broker(&config)?,
        publish: matches!(mode, Mode::Both | Mode::PublishOnly),
        listen: matches!(mode, Mode::Both | Mode::ListenOnly),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(fleet_agent::serve(config, opts))
}
