use crate::output::{print_json, print_table};
use crate::settings::Settings;
use fleet_agent::actions::ActionRegistry;
use fleet_agent::scheduler;
use fleet_core::config::ConfigWarning;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PublishedTopic {
    topic: String,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hz: Option<f64>,
    retain: bool,
}

#[derive(Debug, Serialize)]
struct TopicListing {
    prefix: String,
    publish: Vec<PublishedTopic>,
    subscribe: Vec<String>,
    skipped: Vec<ConfigWarning>,
}

pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    let topics = settings.topics(&config)?;
    let plan = scheduler::plan(&config, &ActionRegistry::builtin(), &topics);

    let mut publish: Vec<PublishedTopic> = plan
        .jobs
        .iter()
        .map(|job| PublishedTopic {
            topic: job.topic.clone(),
            source: format!("{} {}", job.entity.kind.as_str(), job.action.name),
            hz: Some(job.action.rate_hz),
            retain: true,
        })
        .collect();
    publish.push(PublishedTopic {
        topic: topics.command_result(),
        source: "command relay".to_string(),
        hz: None,
        retain: false,
    });

    let listing = TopicListing {
        prefix: topics.prefix().to_string(),
        publish,
        subscribe: topics.subscriptions(),
        skipped: plan.warnings,
    };

    if json {
        return print_json(&listing);
    }

    let mut rows: Vec<Vec<String>> = listing
        .publish
        .iter()
        .map(|p| {
            vec![
                "pub".to_string(),
                p.topic.clone(),
                p.hz.map(|hz| format!("{hz} Hz")).unwrap_or_default(),
                (if p.retain { "retained" } else { "" }).to_string(),
            ]
        })
        .collect();
    rows.extend(
        listing
            .subscribe
            .iter()
            .map(|t| vec!["sub".to_string(), t.clone(), String::new(), String::new()]),
    );
    print_table(&["DIR", "TOPIC", "RATE", "FLAGS"], &rows);

    for w in &listing.skipped {
        eprintln!("skipped: {}", w.message);
    }
    Ok(())
}
