use crate::mqtt_config::MqttConfig;
use crate::mqtt_wrapper::{MqttWrapper, QoS};
use crate::router::{EntityUpdate, UpdateHandler};

use chrono::Local;
use log::{debug, error};
use serde_json::json;

/// Re-publishes every routed update as a retained JSON event, the standalone
/// counterpart of a platform event bus.
pub struct EventPublisher<MQTT: MqttWrapper> {
    client: MQTT,
}

impl<MQTT: MqttWrapper> EventPublisher<MQTT> {
    pub fn new(config: &MqttConfig) -> Self {
        let client = MQTT::new(config, "-ev");
        Self { client }
    }

    fn publish_json(&mut self, topic: &str, payload: serde_json::Value) {
        debug!("Publishing to {topic} with payload {payload}");

        let payload = payload.to_string();
        if let Err(e) = self.client.publish(topic, QoS::AtMostOnce, true, payload) {
            error!("Failed to publish message: {e:?}");
        }
    }
}

impl<MQTT: MqttWrapper> UpdateHandler for EventPublisher<MQTT> {
    fn handle_update(&mut self, update: &EntityUpdate) {
        let topic = format!(
            "solar2mqtt/{}_updated/{}",
            update.entity_type.namespace(),
            update.entity_id
        );
        let payload = json!({
            "entity": update.entity_id,
            "value": update.value,
            "time": Local::now().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        });
        self.publish_json(&topic, payload);
    }
}
