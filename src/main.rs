mod logging;
mod rumqttc_wrapper;

use rumqttc_wrapper::RumqttcWrapper;
use serde_derive::Deserialize;
use solar2mqtt::bridge::Bridge;
use solar2mqtt::entities::Brand;
use solar2mqtt::event_publisher::EventPublisher;
use solar2mqtt::firmware::DEFAULT_HANDSHAKE_TIMEOUT;
use solar2mqtt::mqtt_config::MqttConfig;
use std::fs;
use std::time::Duration;

use log::{error, info};

#[derive(Debug, Deserialize)]
struct Config {
    inverter_brand: Brand,
    dongle_id: String,
    firmware_code: Option<String>,
    handshake_timeout_ms: Option<u64>,
    mqtt: MqttConfig,
}

static POLL_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    logging::init_logger();
    info!("Running revision: {}", env!("GIT_HASH"));
    if std::env::args().len() > 1 {
        error!("Arguments passed. Tool is configured by config.toml in its path");
    }

    // load configuration from current working dir, or relative to executable if former location fails
    let mut path = std::env::current_dir().expect("can't retrieve current dir");
    path.push("config.toml");
    if !path.exists() {
        info!(
            "{} does not exist. Trying relative path",
            path.to_str().expect("Cannot retrieve path")
        );
        path = std::env::current_exe().expect("Unable to get current executable path");
        path.pop();
        path.push("config.toml");
    }
    info!(
        "loading configuration from {}",
        path.to_str().expect("Cannot retrieve path")
    );
    let contents = fs::read_to_string(path).expect("Could not read config.toml");
    let config: Config = toml::from_str(&contents).expect("toml config unparsable");

    info!(
        "bridging {:?} inverter behind dongle {}",
        config.inverter_brand, config.dongle_id
    );
    if let Some(code) = &config.firmware_code {
        info!("using pre-configured firmware code {code}");
    }
    let handshake_timeout = config
        .handshake_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT);

    let mut bridge = Bridge::<RumqttcWrapper>::new(
        &config.mqtt,
        config.inverter_brand,
        &config.dongle_id,
        config.firmware_code,
        handshake_timeout,
    )?;
    bridge.add_handler(Box::new(EventPublisher::<RumqttcWrapper>::new(&config.mqtt)));

    bridge.run(POLL_INTERVAL)
}
