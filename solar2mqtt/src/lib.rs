// externally visible interfaces
pub mod bridge;
pub mod entities;
pub mod event_publisher;
pub mod firmware;
pub mod mqtt_config;
pub mod mqtt_wrapper;
pub mod router;
