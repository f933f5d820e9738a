use crate::entities::{self, Brand};
use crate::firmware::{FirmwareResolver, FirmwareUpdater};
use crate::mqtt_config::MqttConfig;
use crate::mqtt_wrapper::{Message, MqttWrapper, QoS};
use crate::router::{Router, UpdateHandler};

use anyhow::bail;
use log::{debug, info, warn};
use std::time::Duration;

/// Ties the session together: one client connection, the firmware handshake,
/// and the per-message fan-out to the registered update handlers.
pub struct Bridge<MQTT: MqttWrapper> {
    client: MQTT,
    brand: Brand,
    dongle_id: String,
    router: Router,
    resolver: FirmwareResolver,
    updater: FirmwareUpdater,
    handlers: Vec<Box<dyn UpdateHandler>>,
}

impl<MQTT: MqttWrapper> Bridge<MQTT> {
    pub fn new(
        config: &MqttConfig,
        brand: Brand,
        dongle_id: &str,
        firmware_code: Option<String>,
        handshake_timeout: Duration,
    ) -> anyhow::Result<Self> {
        if entities::brand_entities(brand).is_empty() {
            bail!("no entities defined for inverter brand {brand:?}");
        }
        let client = MQTT::new(config, "-br");
        Ok(Self {
            client,
            brand,
            dongle_id: dongle_id.to_string(),
            router: Router::new(brand, dongle_id),
            resolver: FirmwareResolver::new(dongle_id, firmware_code, handshake_timeout),
            updater: FirmwareUpdater::new(dongle_id),
            handlers: Vec::new(),
        })
    }

    pub fn add_handler(&mut self, handler: Box<dyn UpdateHandler>) {
        self.handlers.push(handler);
    }

    /// Control topic standing in for the platform's update button.
    fn control_topic(&self) -> String {
        format!("solar2mqtt/{}/update_firmware", self.dongle_id)
    }

    fn ack_topic(&self) -> String {
        format!("{}/response", self.dongle_id)
    }

    /// Establishes all subscriptions and resolves the firmware code. Fails
    /// setup when the dongle does not answer within the handshake timeout.
    pub fn connect(&mut self) -> anyhow::Result<String> {
        for bank_name in entities::bank_names(self.brand) {
            let topic = format!("{}/{bank_name}", self.dongle_id);
            self.client.subscribe(&topic, QoS::AtMostOnce)?;
            info!("subscribed to topic: {topic}");
        }
        self.client
            .subscribe(&self.resolver.response_topic(), QoS::AtMostOnce)?;
        self.client.subscribe(&self.ack_topic(), QoS::AtMostOnce)?;
        self.client
            .subscribe(&self.control_topic(), QoS::AtMostOnce)?;

        let code = self.resolver.resolve(&mut self.client)?;
        match entities::device_type(&code) {
            Some(device_type) => info!("device identified as {device_type} (firmware code {code})"),
            None => warn!("firmware code {code} not in the device table"),
        }
        Ok(code)
    }

    /// Dispatches one inbound message. Returns the number of update events
    /// handed to the handlers.
    pub fn handle_message(&mut self, message: &Message) -> usize {
        if message.topic == self.control_topic() {
            if let Err(e) = self.updater.press(&mut self.client) {
                warn!("mqtt error: {e:?}");
            }
            return 0;
        }
        if message.topic == self.ack_topic() {
            info!(
                "dongle acknowledgement: {}",
                String::from_utf8_lossy(&message.payload)
            );
            return 0;
        }
        if message.topic == self.resolver.response_topic() {
            // late or duplicate handshake response; the cached code stays
            debug!("ignoring firmware code response, code already resolved");
            return 0;
        }

        let updates = self.router.route(&message.payload);
        for update in &updates {
            self.updater.observe(update);
            for handler in &mut self.handlers {
                handler.handle_update(update);
            }
        }
        updates.len()
    }

    /// Connects, then routes messages until the process is stopped.
    pub fn run(&mut self, poll_interval: Duration) -> anyhow::Result<()> {
        self.connect()?;
        loop {
            if let Some(message) = self.client.recv_timeout(poll_interval) {
                self.handle_message(&message);
            }
        }
    }
}
