//! Per-transport option builders.
//!
//! Each builder owns reading and parsing its configuration document and
//! returns a validated, defaulted, immutable options value.

pub mod grpc;
pub mod kafka;
pub mod mqtt;

pub use grpc::{build_grpc_options, GrpcOptions};
pub use kafka::{
    build_kafka_options, KafkaOptions, KafkaProperties, KafkaTls, KafkaTopics, OffsetReset,
    WildcardTopics,
};
pub use mqtt::{build_mqtt_options, MqttOptions, MqttTopics, QoS};

use crate::{TransportError, TransportResult};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a YAML configuration document into its raw, transport-specific form
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> TransportResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TransportError::config_with_source(
            format!("Failed to read config file {}", path.display()),
            e,
        )
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        TransportError::config_with_source(
            format!("Failed to parse config file {}", path.display()),
            e,
        )
    })
}

/// Parse a YAML configuration document held in memory
pub(crate) fn parse_document<T: DeserializeOwned>(content: &str) -> TransportResult<T> {
    serde_yaml::from_str(content)
        .map_err(|e| TransportError::config_with_source("Failed to parse config document", e))
}
