use solar2mqtt::bridge::Bridge;
use solar2mqtt::entities::{Brand, EntityType};
use solar2mqtt::firmware::{FirmwareResolver, FirmwareUpdater};
use solar2mqtt::mqtt_config::MqttConfig;
use solar2mqtt::mqtt_wrapper::{Message, MqttWrapper, QoS};
use solar2mqtt::router::{EntityUpdate, UpdateHandler};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

struct MqttTester {
    published_values: Vec<(String, Vec<u8>)>,
    inbound: VecDeque<Message>,
}

impl MqttTester {
    fn queue_inbound(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back(Message {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }
}

impl MqttWrapper for MqttTester {
    fn subscribe(&mut self, _topic: &str, _qos: QoS) -> anyhow::Result<()> {
        Ok(())
    }

    fn publish<S, V>(&mut self, topic: S, _qos: QoS, _retain: bool, payload: V) -> anyhow::Result<()>
    where
        S: Clone + Into<String>,
        V: Clone + Into<Vec<u8>>,
    {
        self.published_values.push((topic.into(), payload.into()));
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Option<Message> {
        self.inbound.pop_front()
    }

    fn new(_config: &MqttConfig, _suffix: &str) -> Self {
        Self {
            published_values: Vec::new(),
            inbound: VecDeque::new(),
        }
    }
}

fn test_config() -> MqttConfig {
    MqttConfig {
        host: "frob".to_owned(),
        port: Some(1234),
        username: None,
        password: None,
        client_id: Some("myclient".to_string()),
        tls: None,
    }
}

#[derive(Default)]
struct RecordingHandler {
    updates: Rc<RefCell<Vec<EntityUpdate>>>,
}

impl UpdateHandler for RecordingHandler {
    fn handle_update(&mut self, update: &EntityUpdate) {
        self.updates.borrow_mut().push(update.clone());
    }
}

#[test]
fn handshake_round_trip_resolves_code() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");
    mqtt.queue_inbound("dongle-1/firmwarecode/response", br#"{"FWCode": "AAAB"}"#);

    let mut resolver = FirmwareResolver::new("dongle-1", None, Duration::from_secs(10));
    let code = resolver.resolve(&mut mqtt).unwrap();

    assert_eq!(code, "AAAB");
    assert_eq!(resolver.code(), Some("AAAB"));
    assert_eq!(mqtt.published_values.len(), 1);
    assert_eq!(mqtt.published_values[0].0, "dongle-1/firmwarecode/request");
    assert!(mqtt.published_values[0].1.is_empty());
}

#[test]
fn cached_code_issues_no_request() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");

    let mut resolver =
        FirmwareResolver::new("dongle-1", Some("AAAA".to_string()), Duration::from_secs(10));
    let code = resolver.resolve(&mut mqtt).unwrap();

    assert_eq!(code, "AAAA");
    assert!(mqtt.published_values.is_empty());
}

#[test]
fn resolution_is_idempotent_across_calls() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");
    mqtt.queue_inbound("dongle-1/firmwarecode/response", br#"{"FWCode": "AAAB"}"#);

    let mut resolver = FirmwareResolver::new("dongle-1", None, Duration::from_secs(10));
    resolver.resolve(&mut mqtt).unwrap();
    resolver.resolve(&mut mqtt).unwrap();

    // one request for the first call, none for the second
    assert_eq!(mqtt.published_values.len(), 1);
}

#[test]
fn missing_response_fails_setup() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");

    let mut resolver = FirmwareResolver::new("dongle-1", None, Duration::from_millis(10));
    assert!(resolver.resolve(&mut mqtt).is_err());
}

#[test]
fn telemetry_off_the_response_topic_is_skipped_during_handshake() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");
    mqtt.queue_inbound("dongle-1/inputbank1", br#"{"battery_voltage": 51.2}"#);
    mqtt.queue_inbound("dongle-1/firmwarecode/response", br#"{"FWCode": "AABA"}"#);

    let mut resolver = FirmwareResolver::new("dongle-1", None, Duration::from_secs(10));
    assert_eq!(resolver.resolve(&mut mqtt).unwrap(), "AABA");
}

#[test]
fn bridge_connect_succeeds_with_cached_code() {
    let mut bridge = Bridge::<MqttTester>::new(
        &test_config(),
        Brand::LuxPower,
        "dongle-1",
        Some("AAAA".to_string()),
        Duration::from_secs(10),
    )
    .unwrap();

    let code = bridge.connect().unwrap();
    assert_eq!(code, "AAAA");
}

#[test]
fn bridge_routes_one_update_per_field() {
    let mut bridge = Bridge::<MqttTester>::new(
        &test_config(),
        Brand::LuxPower,
        "Dongle-1",
        Some("AAAA".to_string()),
        Duration::from_secs(10),
    )
    .unwrap();
    let updates = Rc::new(RefCell::new(Vec::new()));
    bridge.add_handler(Box::new(RecordingHandler {
        updates: updates.clone(),
    }));
    bridge.connect().unwrap();

    let routed = bridge.handle_message(&Message {
        topic: "Dongle-1/inputbank1".to_string(),
        payload: br#"{"battery_voltage": 51.2, "ac_charge_enable": "on", "mystery": 7}"#.to_vec(),
    });

    assert_eq!(routed, 3);
    let updates = updates.borrow();
    assert_eq!(updates.len(), 3);

    let by_id = |id: &str| {
        updates
            .iter()
            .find(|update| update.entity_id == id)
            .unwrap()
            .clone()
    };
    assert_eq!(
        by_id("sensor.dongle_1_battery_voltage").entity_type,
        EntityType::Sensor
    );
    assert_eq!(
        by_id("switch.dongle_1_ac_charge_enable").entity_type,
        EntityType::Switch
    );
    // unknown suffixes still surface, typed with the fallback
    assert_eq!(by_id("sensor.dongle_1_mystery").value, serde_json::json!(7));
}

#[test]
fn bridge_drops_malformed_telemetry() {
    let mut bridge = Bridge::<MqttTester>::new(
        &test_config(),
        Brand::LuxPower,
        "dongle-1",
        Some("AAAA".to_string()),
        Duration::from_secs(10),
    )
    .unwrap();
    bridge.connect().unwrap();

    let routed = bridge.handle_message(&Message {
        topic: "dongle-1/inputbank1".to_string(),
        payload: b"{truncated".to_vec(),
    });
    assert_eq!(routed, 0);
}

#[test]
fn update_press_publishes_only_when_newer_firmware_exists() {
    let mut mqtt = MqttTester::new(&test_config(), "-test");
    let mut updater = FirmwareUpdater::new("dongle-1");

    // versions unknown, nothing goes out
    updater.press(&mut mqtt).unwrap();
    assert!(mqtt.published_values.is_empty());

    updater.observe(&EntityUpdate {
        entity_type: EntityType::Sensor,
        entity_id: "sensor.dongle_1_sw_version".to_string(),
        value: serde_json::json!("1.2.0"),
    });
    updater.observe(&EntityUpdate {
        entity_type: EntityType::Sensor,
        entity_id: "sensor.dongle_1_latestfirmwareversion".to_string(),
        value: serde_json::json!("1.2.0"),
    });

    // up to date, still nothing
    updater.press(&mut mqtt).unwrap();
    assert!(mqtt.published_values.is_empty());

    updater.observe(&EntityUpdate {
        entity_type: EntityType::Sensor,
        entity_id: "sensor.dongle_1_latestfirmwareversion".to_string(),
        value: serde_json::json!("1.3.0"),
    });

    updater.press(&mut mqtt).unwrap();
    assert_eq!(mqtt.published_values.len(), 1);
    assert_eq!(mqtt.published_values[0].0, "dongle-1/update");
    assert_eq!(mqtt.published_values[0].1, b"updatedongle".to_vec());
}
