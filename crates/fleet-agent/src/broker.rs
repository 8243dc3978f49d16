//! MQTT transport.
//!
//! Outbound traffic goes through the [`Publisher`] trait so samplers and the
//! dispatcher can be tested without a broker. Inbound publishes are pulled off
//! the rumqttc event loop by [`drive`] and forwarded over a channel; the loop
//! itself never awaits a client request, which would stall it once the request
//! queue fills.

use crate::error::BrokerError;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const REQUEST_CAPACITY: usize = 64;

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), BrokerError>;
}

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl BrokerSettings {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        opts.set_keep_alive(KEEP_ALIVE);
        opts
    }
}

/// One inbound publish, detached from the rumqttc packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Cloneable handle over the rumqttc client.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), BrokerError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| BrokerError::Publish {
                topic: topic.to_string(),
                detail: e.to_string(),
            })
    }
}

/// Create the client and its (not yet polled) event loop.
pub fn connect(settings: &BrokerSettings) -> (MqttPublisher, EventLoop) {
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        client_id = %settings.client_id,
        "connecting to broker"
    );
    let (client, eventloop) = AsyncClient::new(settings.options(), REQUEST_CAPACITY);
    (MqttPublisher { client }, eventloop)
}

/// Subscribe to every topic in `topics`. Failures are logged per topic.
pub async fn subscribe_all(client: &AsyncClient, topics: &[String]) {
    for topic in topics {
        if let Err(e) = client.subscribe(topic.as_str(), QoS::AtLeastOnce).await {
            let err = BrokerError::Subscribe {
                topic: topic.clone(),
                detail: e.to_string(),
            };
            tracing::warn!("{err}");
        }
    }
    tracing::debug!(count = topics.len(), "subscriptions requested");
}

/// Poll the event loop forever.
///
/// Each ConnAck (first connect and every reconnect) re-subscribes to
/// `subscriptions` from a separate task. Inbound publishes are sent to
/// `inbound` when one is given and dropped otherwise.
pub async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<String>,
    inbound: Option<mpsc::UnboundedSender<InboundMessage>>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(code = ?ack.code, "connected to broker");
                if !subscriptions.is_empty() {
                    let client = client.clone();
                    let topics = subscriptions.clone();
                    tokio::spawn(async move { subscribe_all(&client, &topics).await });
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(tx) = &inbound else { continue };
                let msg = InboundMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if tx.send(msg).is_err() {
                    tracing::warn!("inbound receiver dropped; stopping event loop");
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "broker connection error; retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Recording publisher
// ---------------------------------------------------------------------------

/// A publish captured by [`RecordingPublisher`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
    pub at: tokio::time::Instant,
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingPublisher {
    sent: std::sync::Mutex<Vec<Published>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Published> {
        self.sent.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), BrokerError> {
        self.sent.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload,
            retain,
            at: tokio::time::Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_build_options() {
        let settings = BrokerSettings::new("10.0.0.2", 1884, "acme-R-042");
        let opts = settings.options();
        assert_eq!(opts.broker_address(), ("10.0.0.2".to_string(), 1884));
        assert_eq!(opts.client_id(), "acme-R-042");
        assert_eq!(opts.keep_alive(), KEEP_ALIVE);
    }

    #[tokio::test]
    async fn recording_publisher_keeps_order_and_flags() {
        let rec = RecordingPublisher::new();
        rec.publish("a/b", "1".into(), true).await.unwrap();
        rec.publish("a/c", "2".into(), false).await.unwrap();
        rec.publish("a/b", "3".into(), true).await.unwrap();

        let all = rec.published();
        assert_eq!(all.len(), 3);
        assert!(!all[1].retain);
        let on_b: Vec<String> = rec.on_topic("a/b").into_iter().map(|p| p.payload).collect();
        assert_eq!(on_b, ["1", "3"]);
    }
}
