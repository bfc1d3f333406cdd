//! MQTT transport options.
//!
//! ```yaml
//! brokerHost: mosquitto:1883
//! keepAlive: 60
//! pubQoS: 1
//! subQoS: 1
//! dialTimeout: 60
//! topics:
//!   sourceEvents: sources/hub1/clusters/+/sourceevents
//!   agentEvents: sources/hub1/clusters/+/agentevents
//! ```

use crate::types::{non_empty, TlsFiles};
use crate::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_KEEP_ALIVE_SECS: u16 = 60;
pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 60;

/// Build MQTT options from a YAML file
pub fn build_mqtt_options(path: impl AsRef<Path>) -> TransportResult<MqttOptions> {
    let document: MqttConfigDocument = super::read_document(path.as_ref())?;
    MqttOptions::from_document(document)
}

/// MQTT Quality of Service level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    /// At most once delivery
    AtMostOnce = 0,
    /// At least once delivery
    AtLeastOnce = 1,
    /// Exactly once delivery
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("invalid QoS level {}, expected 0, 1 or 2", other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Topic templates; `+` stands in for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttTopics {
    pub source_events: String,
    pub agent_events: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_broadcast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_broadcast: Option<String>,
}

/// Validated MQTT options
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttOptions {
    pub broker_host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsFiles>,
    /// Keep alive interval in seconds
    pub keep_alive: u16,
    pub pub_qos: QoS,
    pub sub_qos: QoS,
    pub dial_timeout: Duration,
    pub topics: MqttTopics,
}

impl MqttOptions {
    /// Parse and validate an in-memory YAML document
    pub fn from_yaml(content: &str) -> TransportResult<Self> {
        let document: MqttConfigDocument = super::parse_document(content)?;
        Self::from_document(document)
    }

    fn from_document(document: MqttConfigDocument) -> TransportResult<Self> {
        let broker_host = non_empty(document.broker_host).ok_or_else(|| {
            TransportError::validation("brokerHost", "brokerHost is required")
        })?;
        split_broker_host(&broker_host)?;

        let tls = TlsFiles::new(
            document.ca_file,
            document.client_cert_file,
            document.client_key_file,
        );
        tls.validate()?;

        let section = document
            .topics
            .ok_or_else(|| TransportError::validation("topics", "topics must be set"))?;
        let topics = MqttTopics {
            source_events: non_empty(section.source_events).ok_or_else(|| {
                TransportError::validation("topics.sourceEvents", "sourceEvents topic is required")
            })?,
            agent_events: non_empty(section.agent_events).ok_or_else(|| {
                TransportError::validation("topics.agentEvents", "agentEvents topic is required")
            })?,
            source_broadcast: non_empty(section.source_broadcast),
            agent_broadcast: non_empty(section.agent_broadcast),
        };

        Ok(Self {
            broker_host,
            username: non_empty(document.username),
            password: document.password,
            tls: (!tls.is_empty()).then_some(tls),
            keep_alive: document.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE_SECS),
            pub_qos: document.pub_qos.unwrap_or(QoS::AtLeastOnce),
            sub_qos: document.sub_qos.unwrap_or(QoS::AtLeastOnce),
            dial_timeout: Duration::from_secs(
                document.dial_timeout.unwrap_or(DEFAULT_DIAL_TIMEOUT_SECS),
            ),
            topics,
        })
    }

    /// Host and port of the broker
    pub fn broker_address(&self) -> TransportResult<(String, u16)> {
        split_broker_host(&self.broker_host)
    }

    /// QoS for publishing
    pub fn publish_qos(&self) -> rumqttc::QoS {
        self.pub_qos.into()
    }

    /// QoS for subscriptions
    pub fn subscribe_qos(&self) -> rumqttc::QoS {
        self.sub_qos.into()
    }

    /// Get MQTT connection options for the given client id
    ///
    /// TLS material is read from disk here, so a missing certificate file
    /// surfaces as a config error.
    pub fn mqtt_options(&self, client_id: &str) -> TransportResult<rumqttc::MqttOptions> {
        let (host, port) = self.broker_address()?;
        // rumqttc joins host and port with a colon before resolving
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };
        let mut options = rumqttc::MqttOptions::new(client_id, host, port);

        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive)));

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username, password);
        }

        if let Some(transport) = self.tls_transport()? {
            options.set_transport(transport);
        }

        Ok(options)
    }

    /// Network options carrying the dial timeout, for `EventLoop::set_network_options`
    pub fn network_options(&self) -> rumqttc::NetworkOptions {
        let mut network = rumqttc::NetworkOptions::new();
        network.set_connection_timeout(self.dial_timeout.as_secs());
        network
    }

    fn tls_transport(&self) -> TransportResult<Option<rumqttc::Transport>> {
        let Some(ca_file) = self.tls.as_ref().and_then(|tls| tls.ca_file.as_deref()) else {
            return Ok(None);
        };
        let ca = read_pem(ca_file)?;

        let client_auth = match self.tls.as_ref() {
            Some(TlsFiles {
                client_cert_file: Some(cert),
                client_key_file: Some(key),
                ..
            }) => Some((read_pem(cert)?, read_pem(key)?)),
            _ => None,
        };

        Ok(Some(rumqttc::Transport::tls(ca, client_auth, None)))
    }
}

fn read_pem(path: &str) -> TransportResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        TransportError::config_with_source(format!("Failed to read TLS file {}", path), e)
    })
}

fn split_broker_host(broker_host: &str) -> TransportResult<(String, u16)> {
    let invalid = |message: String| TransportError::validation("brokerHost", message);

    let address = broker_host
        .split_once("://")
        .map_or(broker_host, |(_, rest)| rest);

    let (host, port) = if let Some(bracketed) = address.strip_prefix('[') {
        let (host, rest) = bracketed.split_once(']').ok_or_else(|| {
            invalid(format!(
                "unterminated IPv6 address in brokerHost {}",
                broker_host
            ))
        })?;
        let port = match rest {
            "" => None,
            rest => Some(rest.strip_prefix(':').ok_or_else(|| {
                invalid(format!(
                    "unexpected characters after IPv6 address in brokerHost {}",
                    broker_host
                ))
            })?),
        };
        (host, port)
    } else if address.matches(':').count() > 1 {
        return Err(invalid(format!(
            "IPv6 address in brokerHost {} must be enclosed in brackets",
            broker_host
        )));
    } else {
        match address.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (address, None),
        }
    };

    if host.is_empty() {
        return Err(invalid(format!("missing host in brokerHost {}", broker_host)));
    }

    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| invalid(format!("invalid port in brokerHost {}", broker_host)))?,
        None => DEFAULT_MQTT_PORT,
    };

    Ok((host.to_string(), port))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MqttConfigDocument {
    broker_host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    ca_file: Option<String>,
    client_cert_file: Option<String>,
    client_key_file: Option<String>,
    keep_alive: Option<u16>,
    #[serde(rename = "pubQoS")]
    pub_qos: Option<QoS>,
    #[serde(rename = "subQoS")]
    sub_qos: Option<QoS>,
    /// Seconds
    dial_timeout: Option<u64>,
    topics: Option<MqttTopicsSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MqttTopicsSection {
    source_events: Option<String>,
    agent_events: Option<String>,
    source_broadcast: Option<String>,
    agent_broadcast: Option<String>,
}
