use crate::bridge::{Bridge, Outgoing};
use crate::config::MqttConfig;
use log::{debug, error, info};
use rumqttc::v5::mqttbytes::v5::{Packet, PublishProperties};
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions};
use tokio::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

/// One message as it came off the broker
pub struct Incoming {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct BridgeStats {
    pub received: u64,
    pub published: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub last_published: Option<Instant>,
}

/// Properties attached to every publish, stale frames must expire on the broker
pub fn publish_properties(config: &MqttConfig) -> PublishProperties {
    PublishProperties {
        message_expiry_interval: Some(config.message_expiry),
        ..Default::default()
    }
}

/// Connects the bridge to the broker: AMS reader messages in, Pulse frames out
pub struct MqttBridge {
    bridge: Bridge,
    client: AsyncClient,
    properties: PublishProperties,
    rx: Receiver<Incoming>,
    stats: BridgeStats,
}

impl MqttBridge {
    pub fn new(config: &MqttConfig, bridge: Bridge) -> Self {
        let (mtx, mrx) = tokio::sync::mpsc::channel(100);

        info!("MQTT v5 connection to {}:{} starting up", config.host, config.port);
        let mut mqttoptions = MqttOptions::new(config.client_name.clone(), config.host.clone(), config.port);
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        if !config.user.is_empty() {
            mqttoptions.set_credentials(config.user.clone(), config.pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(mqttoptions, 10);

        let mut subscriptions = vec![format!("{}/#", config.ams_sub)];
        if let Some(tibber_sub) = &config.tibber_sub {
            subscriptions.push(tibber_sub.clone());
        }

        tokio::spawn(run_eventloop(eventloop, client.clone(), subscriptions, mtx));

        return MqttBridge {
            bridge,
            client,
            properties: publish_properties(config),
            rx: mrx,
            stats: BridgeStats::default(),
        };
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Handles incoming messages until the event loop goes away
    pub async fn start_thread(&mut self) {
        while let Some(msg) = self.rx.recv().await {
            self.stats.received += 1;

            match self.bridge.route(&msg.topic, &msg.payload) {
                Ok(Some(out)) => self.publish(out).await,
                Ok(None) => {
                    if msg.topic.ends_with("/power") || msg.topic.ends_with("/energy") {
                        self.stats.duplicates += 1;
                    }
                },
                Err(e) => {
                    /* One broken message must not stop the bridge */
                    self.stats.failed += 1;
                    error!("{e} for `{}` from `{}` topic", hex::encode_upper(&msg.payload), msg.topic);
                }
            }
        }

        info!("MQTT event loop gone, bridge exits");
    }

    async fn publish(&mut self, out: Outgoing) {
        match self.client.publish_with_properties(
            out.topic.clone(),
            QoS::ExactlyOnce,
            false,
            out.payload,
            self.properties.clone()
        ).await {
            Err(e) => { error!("Error publishing to {}: {}", out.topic, e); },
            Ok(_) => {
                debug!("Published to {}", out.topic);
                self.stats.published += 1;
                self.stats.last_published = Some(Instant::now());
            }
        }
    }
}

async fn run_eventloop(mut eventloop: EventLoop, client: AsyncClient, subscriptions: Vec<String>, tx: Sender<Incoming>) {
    info!("MQTT Eventloop started");
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(p))) => {
                let topic = String::from_utf8_lossy(&p.topic).to_string();
                debug!("Received {} bytes on {}", p.payload.len(), topic);
                let msg = Incoming { topic, payload: p.payload.to_vec() };
                if tx.send(msg).await.is_err() {
                    info!("Bridge is gone, stopping event loop");
                    return;
                }
            },
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected, subscribing {}", subscriptions.join(", "));

                /* The request channel is drained by this very loop, do not wait on it here */
                for topic in subscriptions.iter().cloned() {
                    let client_clone = client.clone();
                    tokio::spawn(async move {
                        if let Err(e) = client_clone.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                            error!("Subscribing {topic} failed: {e}");
                        }
                    });
                }
            },
            Ok(_) => {},
            Err(e) => {
                error!("Error in MQTT {:?}, reconnecting ", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
