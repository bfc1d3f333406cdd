//! Types shared by every transport: the transport selector, topic records,
//! TLS file sets, and the uniform options value returned by the loader.

use crate::options::{GrpcOptions, KafkaOptions, MqttOptions};
use crate::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default topic sources publish resource change events to
pub const DEFAULT_SOURCE_EVENTS_TOPIC: &str = "spec";

/// Default topic agents publish status updates to
pub const DEFAULT_AGENT_EVENTS_TOPIC: &str = "status";

/// Supported backend protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Kafka,
    Mqtt,
    Grpc,
}

impl TransportKind {
    pub const ALL: [TransportKind; 3] = [Self::Kafka, Self::Mqtt, Self::Grpc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Mqtt => "mqtt",
            Self::Grpc => "grpc",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kafka" => Ok(Self::Kafka),
            "mqtt" => Ok(Self::Mqtt),
            "grpc" => Ok(Self::Grpc),
            _ => Err(TransportError::UnsupportedTransport(s.to_string())),
        }
    }
}

/// The two logical channels events flow through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topics {
    /// Where sources publish resource create/update/delete events
    pub source_events: String,
    /// Where agents publish resource status updates
    pub agent_events: String,
}

impl Topics {
    pub fn new(source_events: impl Into<String>, agent_events: impl Into<String>) -> Self {
        Self {
            source_events: source_events.into(),
            agent_events: agent_events.into(),
        }
    }

    /// Both topics must be non-empty once resolved
    pub fn validate(&self) -> TransportResult<()> {
        if self.source_events.is_empty() {
            return Err(TransportError::validation(
                "topics.sourceEvents",
                "sourceEvents topic cannot be empty",
            ));
        }
        if self.agent_events.is_empty() {
            return Err(TransportError::validation(
                "topics.agentEvents",
                "agentEvents topic cannot be empty",
            ));
        }
        Ok(())
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_EVENTS_TOPIC, DEFAULT_AGENT_EVENTS_TOPIC)
    }
}

/// TLS material paths as read from a configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_cert_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key_file: Option<String>,
}

impl TlsFiles {
    /// Build from optional paths, treating empty strings as unset
    pub fn new(
        ca_file: Option<String>,
        client_cert_file: Option<String>,
        client_key_file: Option<String>,
    ) -> Self {
        Self {
            ca_file: non_empty(ca_file),
            client_cert_file: non_empty(client_cert_file),
            client_key_file: non_empty(client_key_file),
        }
    }

    /// Client cert and key come as a pair, and a client pair needs a CA
    pub fn validate(&self) -> TransportResult<()> {
        match (&self.client_cert_file, &self.client_key_file) {
            (Some(_), None) | (None, Some(_)) => Err(TransportError::validation(
                "clientCertFile",
                "either both or none of clientCertFile and clientKeyFile must be set",
            )),
            (Some(_), Some(_)) if self.ca_file.is_none() => Err(TransportError::validation(
                "caFile",
                "setting clientCertFile and clientKeyFile requires caFile",
            )),
            _ => Ok(()),
        }
    }

    pub fn has_client_cert(&self) -> bool {
        self.client_cert_file.is_some() && self.client_key_file.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ca_file.is_none() && self.client_cert_file.is_none() && self.client_key_file.is_none()
    }
}

/// Typed value of a transport property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Topic-naming generation a set of options was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicScheme {
    /// One fixed topic per direction (`spec`/`status` by default)
    Fixed,
    /// Per-source/per-cluster wildcard topics plus broadcast topics
    Wildcard,
}

impl fmt::Display for TopicScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Wildcard => f.write_str("wildcard"),
        }
    }
}

/// Validated options for whichever transport was selected
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportOptions {
    Kafka(KafkaOptions),
    Mqtt(MqttOptions),
    Grpc(GrpcOptions),
}

impl TransportOptions {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Kafka(_) => TransportKind::Kafka,
            Self::Mqtt(_) => TransportKind::Mqtt,
            Self::Grpc(_) => TransportKind::Grpc,
        }
    }

    /// Topic generation, for transports that have more than one
    pub fn topic_scheme(&self) -> Option<TopicScheme> {
        match self {
            Self::Kafka(opts) => Some(opts.topic_scheme()),
            Self::Mqtt(_) | Self::Grpc(_) => None,
        }
    }

    pub fn as_kafka(&self) -> Option<&KafkaOptions> {
        match self {
            Self::Kafka(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn as_mqtt(&self) -> Option<&MqttOptions> {
        match self {
            Self::Mqtt(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn as_grpc(&self) -> Option<&GrpcOptions> {
        match self {
            Self::Grpc(opts) => Some(opts),
            _ => None,
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("kafka".parse::<TransportKind>().unwrap(), TransportKind::Kafka);
        assert_eq!(" MQTT ".parse::<TransportKind>().unwrap(), TransportKind::Mqtt);
        assert_eq!("grpc".parse::<TransportKind>().unwrap(), TransportKind::Grpc);

        let err = "carrier-pigeon".parse::<TransportKind>().unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedTransport(ref s) if s == "carrier-pigeon"));
    }

    #[test]
    fn test_transport_kind_round_trips_through_display() {
        for kind in TransportKind::ALL {
            assert_eq!(kind.to_string().parse::<TransportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_topics_default_and_validate() {
        let topics = Topics::default();
        assert_eq!(topics.source_events, "spec");
        assert_eq!(topics.agent_events, "status");
        assert!(topics.validate().is_ok());

        let err = Topics::new("", "status").validate().unwrap_err();
        assert_eq!(err.field(), Some("topics.sourceEvents"));
        let err = Topics::new("spec", "").validate().unwrap_err();
        assert_eq!(err.field(), Some("topics.agentEvents"));
    }

    #[test]
    fn test_tls_files_pairing() {
        let only_cert = TlsFiles::new(None, Some("cert.pem".into()), None);
        assert_eq!(only_cert.validate().unwrap_err().field(), Some("clientCertFile"));

        let only_key = TlsFiles::new(Some("ca.pem".into()), None, Some("key.pem".into()));
        assert_eq!(only_key.validate().unwrap_err().field(), Some("clientCertFile"));

        let no_ca = TlsFiles::new(None, Some("cert.pem".into()), Some("key.pem".into()));
        assert_eq!(no_ca.validate().unwrap_err().field(), Some("caFile"));

        let full = TlsFiles::new(
            Some("ca.pem".into()),
            Some("cert.pem".into()),
            Some("key.pem".into()),
        );
        assert!(full.validate().is_ok());
        assert!(full.has_client_cert());

        let ca_only = TlsFiles::new(Some("ca.pem".into()), None, None);
        assert!(ca_only.validate().is_ok());
        assert!(!ca_only.has_client_cert());
    }

    #[test]
    fn test_tls_files_ignores_blank_paths() {
        let tls = TlsFiles::new(Some("".into()), Some("  ".into()), None);
        assert!(tls.is_empty());
        assert!(tls.validate().is_ok());
    }

    #[test]
    fn test_property_value_from_yaml() {
        let values: Vec<PropertyValue> = serde_yaml::from_str("[true, 42, latest]").unwrap();
        assert_eq!(
            values,
            vec![
                PropertyValue::Bool(true),
                PropertyValue::Int(42),
                PropertyValue::String("latest".into())
            ]
        );
    }
}
