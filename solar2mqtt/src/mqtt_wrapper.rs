use crate::mqtt_config::MqttConfig;
use std::time::Duration;

#[derive(Clone, Copy)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// An inbound publish as delivered by the client implementation.
#[derive(Clone, Debug)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub trait MqttWrapper {
    // This trait provides an interface that decouples library code from an
    // implementation of the MQTT client. On library calling code, one needs
    // to wrap the MQTT implementation, i.e. the client, in a new type that
    // in turn implements this trait.

    fn subscribe(&mut self, topic: &str, qos: QoS) -> anyhow::Result<()>;

    fn publish<S, V>(&mut self, topic: S, qos: QoS, retain: bool, payload: V) -> anyhow::Result<()>
    where
        S: Clone + Into<String>,
        V: Clone + Into<Vec<u8>>;

    /// Blocks for at most `timeout` waiting for the next message on any
    /// subscribed topic. Returns `None` when the timeout elapses.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<Message>;

    fn new(config: &MqttConfig, suffix: &str) -> Self;
}
