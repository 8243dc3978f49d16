//! Periodic sampling: one task per configured (entity, action) pair.

use crate::actions::{ActionFn, ActionRegistry};
use crate::broker::Publisher;
use fleet_core::config::{Config, ConfigWarning};
use fleet_core::topic::{check_segment, TopicRoot};
use fleet_core::types::{ActionSpec, EntityDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A resolved schedule entry, ready to run.
#[derive(Clone)]
pub struct SamplerJob {
    pub topic: String,
    pub entity: EntityDescriptor,
    pub action: ActionSpec,
    pub sample: ActionFn,
    pub timeout: Duration,
}

impl std::fmt::Debug for SamplerJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerJob")
            .field("topic", &self.topic)
            .field("action", &self.action)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The jobs to run and the entries that were skipped.
#[derive(Debug, Default)]
pub struct Plan {
    pub jobs: Vec<SamplerJob>,
    pub warnings: Vec<ConfigWarning>,
}

/// Resolve every schedule entry against `registry`. Entries naming an unknown
/// action, or whose names cannot be used as topic levels, are skipped.
pub fn plan(config: &Config, registry: &ActionRegistry, topics: &TopicRoot) -> Plan {
    let mut plan = Plan::default();
    let timeout = config.process_timeout();

    for entry in config.schedule() {
        if let Err(e) = check_segment(&entry.entity.name).and(check_segment(&entry.action.name)) {
            plan.warnings.push(ConfigWarning::error(format!(
                "skipping {} '{}' action '{}': {e}",
                entry.entity.kind.as_str(),
                entry.entity.name,
                entry.action.name
            )));
            continue;
        }
        let sample = match registry.resolve(&entry.action.name) {
            Ok(f) => f,
            Err(e) => {
                plan.warnings.push(ConfigWarning::warning(format!(
                    "skipping {} '{}': {e}",
                    entry.entity.kind.as_str(),
                    entry.entity.name
                )));
                continue;
            }
        };
        plan.jobs.push(SamplerJob {
            topic: topics.status(&entry.entity, &entry.action),
            entity: entry.entity,
            action: entry.action,
            sample,
            timeout,
        });
    }

    plan
}

/// Sample, publish retained, sleep; forever.
pub fn spawn_sampler(job: SamplerJob, publisher: Arc<dyn Publisher>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = job.action.period();
        tracing::debug!(topic = %job.topic, period_ms = period.as_millis() as u64, "sampler started");
        loop {
            let value = (job.sample)(&job.entity, job.timeout).await;
            tracing::debug!(topic = %job.topic, value = %value, "publishing sample");
            if let Err(e) = publisher.publish(&job.topic, value, true).await {
                tracing::warn!("{e}");
            }
            tokio::time::sleep(period).await;
        }
    })
}

pub fn spawn_all(jobs: Vec<SamplerJob>, publisher: Arc<dyn Publisher>) -> Vec<JoinHandle<()>> {
    tracing::info!(count = jobs.len(), "starting samplers");
    jobs.into_iter()
        .map(|job| spawn_sampler(job, publisher.clone()))
        .collect()
}
