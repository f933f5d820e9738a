use crate::mqtt_wrapper::{MqttWrapper, QoS};
use crate::router::EntityUpdate;
use anyhow::{anyhow, bail, Context};
use log::{debug, error, info};
use serde_derive::Deserialize;
use std::time::{Duration, Instant};

/// How long the dongle gets to answer the firmware code request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the dongle's firmware code once per session: a configured code
/// is reused as-is, otherwise a single request/response round trip is made.
pub struct FirmwareResolver {
    dongle_id: String,
    code: Option<String>,
    timeout: Duration,
}

impl FirmwareResolver {
    pub fn new(dongle_id: &str, cached_code: Option<String>, timeout: Duration) -> Self {
        Self {
            dongle_id: dongle_id.to_string(),
            code: cached_code,
            timeout,
        }
    }

    pub fn request_topic(&self) -> String {
        format!("{}/firmwarecode/request", self.dongle_id)
    }

    pub fn response_topic(&self) -> String {
        format!("{}/firmwarecode/response", self.dongle_id)
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Idempotent: once a code is cached no further request is published.
    /// Fails when no valid response arrives within the timeout.
    pub fn resolve<MQTT: MqttWrapper>(&mut self, client: &mut MQTT) -> anyhow::Result<String> {
        if let Some(code) = &self.code {
            info!("firmware code found in configuration: {code}");
            return Ok(code.clone());
        }

        info!("requesting firmware code");
        client.publish(self.request_topic(), QoS::AtMostOnce, false, "")?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let Some(message) = client.recv_timeout(deadline - now) else {
                break;
            };
            if message.topic != self.response_topic() {
                debug!("ignoring {} while waiting for firmware code", message.topic);
                continue;
            }
            match parse_response(&message.payload) {
                Ok(code) => {
                    info!("firmware code received: {code}");
                    self.code = Some(code.clone());
                    return Ok(code);
                }
                Err(e) => error!("bad firmware code response: {e}"),
            }
        }
        bail!(
            "firmware code response not received within {:.1}s",
            self.timeout.as_secs_f64()
        )
    }
}

fn parse_response(payload: &[u8]) -> anyhow::Result<String> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "FWCode")]
        fw_code: Option<String>,
    }

    let response: Response =
        serde_json::from_slice(payload).context("failed to decode JSON from response")?;
    response
        .fw_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| anyhow!("no firmware code found in response"))
}

/// Tracks the firmware versions the dongle reports and issues the update
/// command only when a newer build is available.
pub struct FirmwareUpdater {
    dongle_id: String,
    sw_version: Option<String>,
    latest_version: Option<String>,
}

impl FirmwareUpdater {
    pub fn new(dongle_id: &str) -> Self {
        Self {
            dongle_id: dongle_id.to_string(),
            sw_version: None,
            latest_version: None,
        }
    }

    /// Feeds routed updates through, capturing the two version sensors.
    pub fn observe(&mut self, update: &EntityUpdate) {
        let Some(value) = update.value.as_str() else {
            return;
        };
        if update.entity_id.ends_with("_sw_version") {
            self.sw_version = Some(value.to_string());
        } else if update.entity_id.ends_with("_latestfirmwareversion") {
            self.latest_version = Some(value.to_string());
        }
    }

    /// `None` until both versions have been seen. Versions are compared as
    /// strings, matching the dongle's zero-padded version scheme.
    pub fn update_available(&self) -> Option<bool> {
        match (&self.sw_version, &self.latest_version) {
            (Some(current), Some(latest)) => Some(current < latest),
            _ => None,
        }
    }

    /// Handles an update trigger. Publishes `updatedongle` to the dongle's
    /// update topic when an update is due, otherwise only logs the outcome.
    pub fn press<MQTT: MqttWrapper>(&self, client: &mut MQTT) -> anyhow::Result<()> {
        match self.update_available() {
            None => {
                error!(
                    "could not retrieve version information for {}",
                    self.dongle_id
                );
            }
            Some(false) => {
                info!(
                    "no firmware update needed for {} (running {}, latest {})",
                    self.dongle_id,
                    self.sw_version.as_deref().unwrap_or("unknown"),
                    self.latest_version.as_deref().unwrap_or("unknown"),
                );
            }
            Some(true) => {
                let topic = format!("{}/update", self.dongle_id);
                info!("firmware update requested, publishing to {topic}");
                client.publish(topic, QoS::AtLeastOnce, false, "updatedongle")?;
            }
        }
        Ok(())
    }
}
