pub mod actions;
pub mod broker;
pub mod dispatch;
pub mod error;
pub mod process;
pub mod reconfigure;
pub mod relay;
pub mod scheduler;

use anyhow::Context;
use broker::{BrokerSettings, Publisher};
use dispatch::MessageHandler;
use fleet_core::config::Config;
use fleet_core::topic::TopicRoot;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a running agent does and where it connects.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub topics: TopicRoot,
    pub broker: BrokerSettings,
    /// Run the periodic samplers.
    pub publish: bool,
    /// Subscribe to the control topics and handle updates and commands.
    pub listen: bool,
}

/// Run the agent on one broker connection until ctrl-c.
pub async fn serve(config: Config, opts: AgentOptions) -> anyhow::Result<()> {
    if !opts.publish && !opts.listen {
        anyhow::bail!("nothing to do: both publishing and listening are disabled");
    }

    let plan = if opts.publish {
        scheduler::plan(&config, &actions::ActionRegistry::builtin(), &opts.topics)
    } else {
        scheduler::Plan::default()
    };
    for warning in &plan.warnings {
        tracing::warn!("{}", warning.message);
    }
    if opts.publish && plan.jobs.is_empty() {
        tracing::warn!("no (entity, action) pairs configured; nothing will be published");
    }

    let (mqtt, eventloop) = broker::connect(&opts.broker);
    let client = mqtt.client().clone();
    let publisher: Arc<dyn Publisher> = Arc::new(mqtt);

    let mut tasks = Vec::new();
    let (subscriptions, inbound) = if opts.listen {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = MessageHandler::from_config(&config, opts.topics.clone(), publisher.clone());
        tasks.push(tokio::spawn(handler.run(rx)));
        (opts.topics.subscriptions(), Some(tx))
    } else {
        (Vec::new(), None)
    };

    let mut driver = tokio::spawn(broker::drive(eventloop, client, subscriptions, inbound));
    tasks.extend(scheduler::spawn_all(plan.jobs, publisher));

    tracing::info!(prefix = %opts.topics.prefix(), "agent running");

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            Ok(())
        }
        _ = &mut driver => Err(anyhow::anyhow!("broker event loop stopped")),
    };

    driver.abort();
    for task in tasks {
        task.abort();
    }
    result
}
