use crate::entities::{determine_entity_type, Brand, EntityType};
use log::{debug, error};

/// A single routed field update. Lifecycle is transient: emitted to the
/// registered handlers, then discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityUpdate {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub value: serde_json::Value,
}

/// Receives routed updates. The bridge fans every update out to each
/// registered handler in turn.
pub trait UpdateHandler {
    fn handle_update(&mut self, update: &EntityUpdate);
}

/// Decodes bank telemetry payloads into typed per-field updates.
pub struct Router {
    brand: Brand,
    device_id: String,
}

impl Router {
    pub fn new(brand: Brand, dongle_id: &str) -> Self {
        Self {
            brand,
            device_id: normalize(dongle_id),
        }
    }

    /// One update per payload field, typed from the brand table. Malformed
    /// JSON is logged and dropped, no requeue.
    pub fn route(&self, payload: &[u8]) -> Vec<EntityUpdate> {
        let data: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_slice(payload) {
                Ok(data) => data,
                Err(e) => {
                    error!("invalid JSON payload received: {e}");
                    return Vec::new();
                }
            };

        data.into_iter()
            .map(|(suffix, value)| {
                let entity_type = determine_entity_type(self.brand, &suffix);
                let entity_id = format!(
                    "{}.{}_{}",
                    entity_type.namespace(),
                    self.device_id,
                    normalize(&suffix)
                );
                debug!("routing update for {entity_id} with value {value}");
                EntityUpdate {
                    entity_type,
                    entity_id,
                    value,
                }
            })
            .collect()
    }
}

/// Entity ids are lowercase with `-` flattened to `_`.
fn normalize(id: &str) -> String {
    id.to_lowercase().replace('-', "_")
}
