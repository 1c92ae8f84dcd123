//! MQTT control bus
//!
//! The ESP-IDF client delivers events on a connection that must be drained
//! continuously, so a dedicated pump thread decodes them and forwards the
//! results to the controller loop over a channel. The loop keeps the client
//! itself and re-subscribes whenever the pump reports a fresh connection.

use std::sync::mpsc::Sender;

use anyhow::Result;
use embedded_svc::mqtt::client::{Details, EventPayload, QoS};
use esp_idf_svc::mqtt::client::{EspMqttClient, EspMqttConnection, MqttClientConfiguration};
use log::{debug, info, warn};
use studio_logo_lib::{ControlMessage, Topics};

use crate::thread_util::spawn_named;

const PUMP_STACK_SIZE: usize = 8192;

/// Events forwarded from the pump thread.
#[derive(Debug)]
pub enum BusEvent {
    Connected,
    Disconnected,
    Control(ControlMessage),
}

pub struct MqttBus {
    client: EspMqttClient<'static>,
    topics: Topics,
}

impl MqttBus {
    /// Create the client and start the pump. The client connects (and
    /// reconnects) in the background; watch for [`BusEvent::Connected`].
    pub fn start(url: &str, client_id: &str, topics: Topics, events: Sender<BusEvent>) -> Result<Self> {
        info!("Connecting to MQTT broker {url} as '{client_id}'");
        let (client, mut connection) = EspMqttClient::new(
            url,
            &MqttClientConfiguration {
                client_id: Some(client_id),
                ..Default::default()
            },
        )?;

        let pump_topics = topics.clone();
        spawn_named(c"mqtt_pump", PUMP_STACK_SIZE, move || {
            pump(&mut connection, &pump_topics, &events);
        })?;

        Ok(Self { client, topics })
    }

    pub fn subscribe_all(&mut self) -> Result<()> {
        for topic in self.topics.all() {
            self.client.subscribe(topic, QoS::AtMostOnce)?;
            info!("Subscribed to '{topic}'");
        }
        Ok(())
    }
}

fn pump(connection: &mut EspMqttConnection, topics: &Topics, events: &Sender<BusEvent>) {
    while let Ok(event) = connection.next() {
        let forwarded = match event.payload() {
            EventPayload::Connected(_) => Some(BusEvent::Connected),
            EventPayload::Disconnected => Some(BusEvent::Disconnected),
            EventPayload::Received {
                topic,
                data,
                details,
                ..
            } => decode(topics, topic, data, &details),
            EventPayload::Error(e) => {
                warn!("MQTT error: {e:?}");
                None
            }
            _ => None,
        };

        if let Some(bus_event) = forwarded {
            if events.send(bus_event).is_err() {
                warn!("Controller channel closed, stopping MQTT pump");
                return;
            }
        }
    }
    info!("MQTT connection closed");
}

fn decode(topics: &Topics, topic: Option<&str>, data: &[u8], details: &Details) -> Option<BusEvent> {
    let Some(topic) = topic else {
        warn!("Dropping MQTT message without a topic");
        return None;
    };
    if !matches!(details, Details::Complete) {
        warn!("Dropping fragmented MQTT message on '{topic}'");
        return None;
    }
    debug!("MQTT message on '{topic}': {} bytes", data.len());

    match topics.decode(topic, data) {
        Ok(Some(message)) => Some(BusEvent::Control(message)),
        Ok(None) => {
            info!("Ignoring message on unhandled topic '{topic}'");
            None
        }
        Err(e) => {
            warn!("Ignoring message on '{topic}': {e}");
            None
        }
    }
}
