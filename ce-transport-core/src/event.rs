//! CloudEvent handle passed through a transport client.
//!
//! Only the attributes a transport needs for routing are modelled here;
//! envelope encoding for a given protocol is the binding's concern.

use crate::{TransportError, TransportResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub const SPEC_VERSION: &str = "1.0";

/// A CloudEvent ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    /// Unique event id
    pub id: String,
    /// Producer of the event (a source id or an agent id)
    pub source: String,
    /// Event type, e.g. `manifests.spec.create_request`
    pub event_type: String,
    pub spec_version: String,
    pub time: Option<DateTime<Utc>>,
    pub data_content_type: Option<String>,
    pub data: Vec<u8>,
    /// Extension attributes (cluster name, resource version, ...)
    pub extensions: HashMap<String, String>,
}

impl CloudEvent {
    /// Create an event with a fresh id and the current time
    pub fn new(source: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            spec_version: SPEC_VERSION.to_string(),
            time: Some(Utc::now()),
            data_content_type: None,
            data: Vec::new(),
            extensions: HashMap::new(),
        }
    }

    /// Create an event carrying a JSON-serialized payload
    pub fn from_json<T: Serialize>(
        source: impl Into<String>,
        event_type: impl Into<String>,
        data: &T,
    ) -> TransportResult<Self> {
        let payload = serde_json::to_vec(data)
            .map_err(|e| TransportError::fatal_with_source("Failed to serialize event data", e))?;
        Ok(Self::new(source, event_type).with_data("application/json", payload))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_data(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.data_content_type = Some(content_type.into());
        self.data = data;
        self
    }

    /// Add an extension attribute
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(|s| s.as_str())
    }

    /// Get the payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Deserialize the payload as JSON
    pub fn data_json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        serde_json::from_slice(&self.data)
            .map_err(|e| TransportError::fatal_with_source("Failed to deserialize event data", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_new_event() {
        let event = CloudEvent::new("hub1", "manifests.spec.create_request");

        assert_eq!(event.source, "hub1");
        assert_eq!(event.event_type, "manifests.spec.create_request");
        assert_eq!(event.spec_version, "1.0");
        assert!(event.time.is_some());
        assert!(!event.id.is_empty());
        assert_eq!(event.size(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = CloudEvent::new("hub1", "t");
        let b = CloudEvent::new("hub1", "t");
        assert_ne!(a.id, b.id);
        assert_eq!(a.with_id("fixed").id, "fixed");
    }

    #[test]
    fn test_json_payload() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Status {
            name: String,
            generation: i64,
        }

        let status = Status {
            name: "work-1".to_string(),
            generation: 3,
        };
        let event = CloudEvent::from_json("cluster1", "manifests.status.update_request", &status)
            .unwrap();

        assert_eq!(event.data_content_type.as_deref(), Some("application/json"));
        let decoded: Status = event.data_json().unwrap();
        assert_eq!(decoded, status);
    }

    #[test]
    fn test_extensions() {
        let event = CloudEvent::new("hub1", "t")
            .with_extension("clustername", "cluster1")
            .with_extension("resourceversion", "4");

        assert_eq!(event.extension("clustername"), Some("cluster1"));
        assert_eq!(event.extension("resourceversion"), Some("4"));
        assert_eq!(event.extension("missing"), None);
    }
}
