mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::run::Mode;
use settings::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fleet-agent",
    about = "Robot-side fleet telemetry agent: publishes status to MQTT and applies dashboard updates",
    version,
    propagate_version = true
)]
struct Cli {
    /// Status config YAML
    #[arg(long, global = true, env = "MRS_FLEET_DASHBOARD_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Robot manufacturer (second topic level)
    #[arg(long, global = true, env = "ROBOT_MANUFACTURER")]
    manufacturer: Option<String>,

    /// Robot serial number (third topic level)
    #[arg(long, global = true, env = "ROBOT_SERIAL_NUMBER")]
    serial: Option<String>,

    /// Broker host (default: config publish.mqtt.broker_ip, then localhost)
    #[arg(long, global = true, env = "MQTT_BROKER_IP")]
    broker_host: Option<String>,

    /// Broker port (default: config publish.mqtt.broker_port, then 1883)
    #[arg(long, global = true, env = "MQTT_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Topic namespace (default: config publish.mqtt.namespace, then empty)
    #[arg(long, global = true, env = "MQTT_BROKER_NS")]
    namespace: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish status and listen for dashboard updates on one connection
    Run,

    /// Publish status only
    Publish,

    /// Listen for dashboard updates and commands only
    Listen,

    /// List every topic the agent publishes and subscribes to
    Topics,

    /// Inspect the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run | Commands::Publish | Commands::Listen => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let settings = Settings {
        config: cli.config,
        manufacturer: cli.manufacturer,
        serial: cli.serial,
        broker_host: cli.broker_host,
        broker_port: cli.broker_port,
        namespace: cli.namespace,
    };

    let result = match cli.command {
        Commands::Run => cmd::run::run(&settings, Mode::Both),
        Commands::Publish => cmd::run::run(&settings, Mode::PublishOnly),
        Commands::Listen => cmd::run::run(&settings, Mode::ListenOnly),
        Commands::Topics => cmd::topics::run(&settings, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&settings, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
