use serde_derive::Deserialize;

/// Inverter brands with a known telemetry schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Brand {
    LuxPower,
    Solis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityType {
    Sensor,
    Switch,
    Number,
    Time,
    TimeHhmm,
    Select,
    Button,
}

impl EntityType {
    /// The namespace an update is surfaced under. `TimeHhmm` is a
    /// payload-format variant of `Time` and shares its namespace.
    pub fn namespace(self) -> &'static str {
        match self {
            EntityType::Sensor => "sensor",
            EntityType::Switch => "switch",
            EntityType::Number => "number",
            EntityType::Time | EntityType::TimeHhmm => "time",
            EntityType::Select => "select",
            EntityType::Button => "button",
        }
    }
}

/// One entry of a brand's schema table: which bank a field arrives on and
/// which entity namespace it belongs to. Immutable after load.
#[derive(Clone, Copy, Debug)]
pub struct EntityDefinition {
    pub entity_type: EntityType,
    pub unique_id: &'static str,
    pub bank_name: &'static str,
}

impl EntityDefinition {
    const fn new(
        entity_type: EntityType,
        unique_id: &'static str,
        bank_name: &'static str,
    ) -> Self {
        Self {
            entity_type,
            unique_id,
            bank_name,
        }
    }
}

const LUX_POWER: &[EntityDefinition] = &[
    // inputbank1: live electrical readings
    EntityDefinition::new(EntityType::Sensor, "battery_voltage", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "battery_current", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "battery_soc", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "grid_voltage", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "grid_frequency", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "pv1_voltage", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "pv1_power", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "pv2_voltage", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "pv2_power", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "inverter_output_power", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "load_power", "inputbank1"),
    // inputbank2: accumulated yields, temperatures and dongle housekeeping
    EntityDefinition::new(EntityType::Sensor, "daily_pv_generation", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "total_pv_generation", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "daily_battery_charge", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "daily_battery_discharge", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "inverter_temperature", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "radiator_temperature", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "sw_version", "inputbank2"),
    EntityDefinition::new(EntityType::Sensor, "latestfirmwareversion", "inputbank2"),
    // holdbank1: writable on/off registers
    EntityDefinition::new(EntityType::Switch, "ac_charge_enable", "holdbank1"),
    EntityDefinition::new(EntityType::Switch, "forced_discharge_enable", "holdbank1"),
    EntityDefinition::new(EntityType::Switch, "eps_enable", "holdbank1"),
    EntityDefinition::new(EntityType::Switch, "feed_in_grid_enable", "holdbank1"),
    EntityDefinition::new(EntityType::Number, "ac_charge_power_limit", "holdbank1"),
    EntityDefinition::new(EntityType::Number, "charge_current_limit", "holdbank1"),
    EntityDefinition::new(EntityType::Number, "discharge_current_limit", "holdbank1"),
    // holdbank2: SOC windows and operating mode
    EntityDefinition::new(EntityType::Number, "ac_charge_soc_limit", "holdbank2"),
    EntityDefinition::new(EntityType::Number, "discharge_cutoff_soc", "holdbank2"),
    EntityDefinition::new(EntityType::Select, "operating_mode", "holdbank2"),
    EntityDefinition::new(EntityType::Select, "ac_charge_type", "holdbank2"),
    // timebank: schedule windows; the HH:MM registers arrive as plain strings
    EntityDefinition::new(EntityType::Time, "ac_charge_start1", "timebank"),
    EntityDefinition::new(EntityType::Time, "ac_charge_end1", "timebank"),
    EntityDefinition::new(EntityType::Time, "forced_discharge_start1", "timebank"),
    EntityDefinition::new(EntityType::Time, "forced_discharge_end1", "timebank"),
    EntityDefinition::new(EntityType::TimeHhmm, "peak_shaving_start1", "timebank"),
    EntityDefinition::new(EntityType::TimeHhmm, "peak_shaving_end1", "timebank"),
    EntityDefinition::new(EntityType::Button, "firmware_update", "firmware"),
];

const SOLIS: &[EntityDefinition] = &[
    EntityDefinition::new(EntityType::Sensor, "battery_voltage", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "battery_soc", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "active_power", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "grid_frequency", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "sw_version", "inputbank1"),
    EntityDefinition::new(EntityType::Sensor, "latestfirmwareversion", "inputbank1"),
    EntityDefinition::new(EntityType::Switch, "self_use_enable", "holdbank1"),
    EntityDefinition::new(EntityType::Number, "charge_limit", "holdbank1"),
    EntityDefinition::new(EntityType::Time, "charge_start1", "timebank"),
    EntityDefinition::new(EntityType::Button, "firmware_update", "firmware"),
];

/// Maps a firmware code from the handshake to a device-type label.
const FIRMWARE_CODES: &[(&str, &str)] = &[
    ("AAAA", "LuxPower 12K Hybrid"),
    ("AAAB", "LuxPower 18K Hybrid"),
    ("AABA", "LuxPower ACS 6K"),
    ("BAAA", "Solis S6 Hybrid"),
];

pub fn brand_entities(brand: Brand) -> &'static [EntityDefinition] {
    match brand {
        Brand::LuxPower => LUX_POWER,
        Brand::Solis => SOLIS,
    }
}

/// The distinct bank names of a brand, in table order. Each bank is one
/// telemetry topic under the dongle id.
pub fn bank_names(brand: Brand) -> Vec<&'static str> {
    let mut banks = Vec::new();
    for entity in brand_entities(brand) {
        if !banks.contains(&entity.bank_name) {
            banks.push(entity.bank_name);
        }
    }
    banks
}

/// Resolves a payload field suffix to its entity type. The lookup is total:
/// suffixes missing from the table fall back to `Sensor`.
pub fn determine_entity_type(brand: Brand, entity_id_suffix: &str) -> EntityType {
    for entity in brand_entities(brand) {
        if entity.unique_id == entity_id_suffix {
            return match entity.entity_type {
                EntityType::TimeHhmm => EntityType::Time,
                other => other,
            };
        }
    }
    EntityType::Sensor
}

pub fn device_type(firmware_code: &str) -> Option<&'static str> {
    FIRMWARE_CODES
        .iter()
        .find(|(code, _)| *code == firmware_code)
        .map(|(_, device_type)| *device_type)
}
