//! Kafka transport options.
//!
//! Two document generations are understood, and the one a document uses
//! decides the topic-naming scheme of the resulting options:
//!
//! ```yaml
//! # Fixed topics: property overrides under `configs`
//! configs:
//!   bootstrap.servers: broker:9092
//! topics:
//!   sourceEvents: spec
//!   agentEvents: status
//! ```
//!
//! ```yaml
//! # Wildcard topics: typed top-level fields
//! bootstrapServer: broker:9092
//! caFile: /certs/ca.pem
//! clientCertFile: /certs/client.pem
//! clientKeyFile: /certs/client-key.pem
//! groupID: agent-1
//! ```
//!
//! Operational defaults live in [`KafkaProperties::new`]; anything a document
//! sets is layered on top of them.

use crate::types::{non_empty, PropertyValue, TlsFiles, TopicScheme, Topics};
use crate::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Sources publish resource events here; wildcards are source, then cluster
pub const SOURCE_EVENTS_WILDCARD_TOPIC: &str = "sourceevents.*.*";
/// Agents publish status events here; wildcards are source, then cluster
pub const AGENT_EVENTS_WILDCARD_TOPIC: &str = "agentevents.*.*";
/// A source publishes to every agent here; the wildcard is the source
pub const SOURCE_BROADCAST_WILDCARD_TOPIC: &str = "sourcebroadcast.*";
/// An agent publishes to every source here; the wildcard is the cluster
pub const AGENT_BROADCAST_WILDCARD_TOPIC: &str = "agentbroadcast.*";

pub const DEFAULT_EVENTS_CHANNEL_SIZE: u32 = 1000;
pub const DEFAULT_ACKS: &str = "1";
pub const DEFAULT_RETRIES: u32 = 0;
pub const DEFAULT_QUEUED_MAX_MESSAGES_KBYTES: u32 = 32 * 1024;
pub const DEFAULT_AUTO_COMMIT_INTERVAL_MS: u32 = 5000;
pub const DEFAULT_ENDPOINT_IDENTIFICATION_ALGORITHM: &str = "none";
pub const SSL_SECURITY_PROTOCOL: &str = "ssl";

/// Build Kafka options from a YAML file
pub fn build_kafka_options(path: impl AsRef<Path>) -> TransportResult<KafkaOptions> {
    let document: KafkaConfigDocument = super::read_document(path.as_ref())?;
    KafkaOptions::from_document(document)
}

/// Where the consumer starts when the group has no committed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    #[serde(alias = "smallest")]
    Earliest,
    #[serde(alias = "largest")]
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for OffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete TLS material for a Kafka client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KafkaTls {
    pub ca_location: String,
    pub certificate_location: String,
    pub key_location: String,
}

/// Resolved client properties with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KafkaProperties {
    pub bootstrap_servers: String,
    pub group_id: Option<String>,
    pub socket_keepalive_enable: bool,
    /// Broker reconnects are expected, so connection-close logging is off
    pub log_connection_close: bool,
    /// "none" works around librdkafka issue 4349
    pub ssl_endpoint_identification_algorithm: String,
    /// Capacity of the client's event channel (producer and consumer)
    pub events_channel_size: u32,

    // producer
    pub acks: String,
    /// Retry policy belongs to the caller
    pub retries: u32,

    // consumer
    pub enable_auto_commit: bool,
    pub enable_auto_offset_store: bool,
    pub queued_max_messages_kbytes: u32,
    pub auto_offset_reset: OffsetReset,
    pub auto_commit_interval_ms: u32,

    pub security_protocol: Option<String>,
    pub tls: Option<KafkaTls>,

    /// Properties this crate does not model, passed through verbatim
    pub extra: BTreeMap<String, PropertyValue>,
}

impl KafkaProperties {
    /// Properties for the given brokers with every operational default applied
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: None,
            socket_keepalive_enable: true,
            log_connection_close: false,
            ssl_endpoint_identification_algorithm: DEFAULT_ENDPOINT_IDENTIFICATION_ALGORITHM
                .to_string(),
            events_channel_size: DEFAULT_EVENTS_CHANNEL_SIZE,
            acks: DEFAULT_ACKS.to_string(),
            retries: DEFAULT_RETRIES,
            enable_auto_commit: true,
            enable_auto_offset_store: true,
            queued_max_messages_kbytes: DEFAULT_QUEUED_MAX_MESSAGES_KBYTES,
            auto_offset_reset: OffsetReset::Latest,
            auto_commit_interval_ms: DEFAULT_AUTO_COMMIT_INTERVAL_MS,
            security_protocol: None,
            tls: None,
            extra: BTreeMap::new(),
        }
    }

    fn apply_overrides(&mut self, overrides: PropertyOverrides) {
        if let Some(group_id) = non_empty(overrides.group_id) {
            self.group_id = Some(group_id);
        }
        if let Some(v) = overrides.socket_keepalive_enable {
            self.socket_keepalive_enable = v;
        }
        if let Some(v) = overrides.log_connection_close {
            self.log_connection_close = v;
        }
        if let Some(v) = overrides.ssl_endpoint_identification_algorithm {
            self.ssl_endpoint_identification_algorithm = v;
        }
        if let Some(v) = overrides.events_channel_size {
            self.events_channel_size = v;
        }
        if let Some(v) = overrides.acks {
            self.acks = v.to_string();
        }
        if let Some(v) = overrides.retries {
            self.retries = v;
        }
        if let Some(v) = overrides.enable_auto_commit {
            self.enable_auto_commit = v;
        }
        if let Some(v) = overrides.enable_auto_offset_store {
            self.enable_auto_offset_store = v;
        }
        if let Some(v) = overrides.queued_max_messages_kbytes {
            self.queued_max_messages_kbytes = v;
        }
        if let Some(v) = overrides.auto_offset_reset {
            self.auto_offset_reset = v;
        }
        if let Some(v) = overrides.auto_commit_interval_ms {
            self.auto_commit_interval_ms = v;
        }
        if let Some(v) = non_empty(overrides.security_protocol) {
            self.security_protocol = Some(v);
        }
        if !overrides.extra.is_empty() {
            debug!(
                "Passing through {} unmodelled Kafka properties",
                overrides.extra.len()
            );
        }
        self.extra.extend(overrides.extra);
    }
}

/// Concrete topic names addressed by a Kafka client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum KafkaTopics {
    Fixed(Topics),
    Wildcard(WildcardTopics),
}

/// Per-source/per-cluster topic patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WildcardTopics {
    pub source_events: String,
    pub agent_events: String,
    pub source_broadcast: String,
    pub agent_broadcast: String,
}

impl Default for WildcardTopics {
    fn default() -> Self {
        Self {
            source_events: SOURCE_EVENTS_WILDCARD_TOPIC.to_string(),
            agent_events: AGENT_EVENTS_WILDCARD_TOPIC.to_string(),
            source_broadcast: SOURCE_BROADCAST_WILDCARD_TOPIC.to_string(),
            agent_broadcast: AGENT_BROADCAST_WILDCARD_TOPIC.to_string(),
        }
    }
}

impl KafkaTopics {
    pub fn scheme(&self) -> TopicScheme {
        match self {
            Self::Fixed(_) => TopicScheme::Fixed,
            Self::Wildcard(_) => TopicScheme::Wildcard,
        }
    }

    /// The source-events topic as configured (a pattern for wildcard topics)
    pub fn source_events(&self) -> &str {
        match self {
            Self::Fixed(topics) => &topics.source_events,
            Self::Wildcard(topics) => &topics.source_events,
        }
    }

    /// The agent-events topic as configured (a pattern for wildcard topics)
    pub fn agent_events(&self) -> &str {
        match self {
            Self::Fixed(topics) => &topics.agent_events,
            Self::Wildcard(topics) => &topics.agent_events,
        }
    }

    /// Topic a source publishes to for one cluster
    pub fn source_events_for(&self, source: &str, cluster: &str) -> String {
        match self {
            Self::Fixed(topics) => topics.source_events.clone(),
            Self::Wildcard(topics) => fill_wildcards(&topics.source_events, &[source, cluster]),
        }
    }

    /// Topic an agent publishes to for one source
    pub fn agent_events_for(&self, source: &str, cluster: &str) -> String {
        match self {
            Self::Fixed(topics) => topics.agent_events.clone(),
            Self::Wildcard(topics) => fill_wildcards(&topics.agent_events, &[source, cluster]),
        }
    }

    /// Broadcast topic of a source; fixed topics have no broadcast channel
    pub fn source_broadcast_for(&self, source: &str) -> Option<String> {
        match self {
            Self::Fixed(_) => None,
            Self::Wildcard(topics) => Some(fill_wildcards(&topics.source_broadcast, &[source])),
        }
    }

    /// Broadcast topic of a cluster's agent; fixed topics have no broadcast channel
    pub fn agent_broadcast_for(&self, cluster: &str) -> Option<String> {
        match self {
            Self::Fixed(_) => None,
            Self::Wildcard(topics) => Some(fill_wildcards(&topics.agent_broadcast, &[cluster])),
        }
    }
}

fn fill_wildcards(pattern: &str, segments: &[&str]) -> String {
    let mut segments = segments.iter();
    pattern
        .split('.')
        .map(|part| match part {
            "*" => segments.next().copied().unwrap_or(part),
            _ => part,
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Validated Kafka options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KafkaOptions {
    pub properties: KafkaProperties,
    pub topics: KafkaTopics,
}

impl KafkaOptions {
    /// Parse and validate an in-memory YAML document
    pub fn from_yaml(content: &str) -> TransportResult<Self> {
        let document: KafkaConfigDocument = super::parse_document(content)?;
        Self::from_document(document)
    }

    fn from_document(document: KafkaConfigDocument) -> TransportResult<Self> {
        let mut overrides = document.configs.unwrap_or_default();

        let (bootstrap_servers, scheme) = match (
            non_empty(overrides.bootstrap_servers.take()),
            non_empty(document.bootstrap_server),
        ) {
            (Some(_), Some(_)) => {
                return Err(TransportError::validation(
                    "bootstrapServer",
                    "bootstrap.servers and bootstrapServer are mutually exclusive",
                ))
            }
            (Some(servers), None) => (servers, TopicScheme::Fixed),
            (None, Some(servers)) => (servers, TopicScheme::Wildcard),
            (None, None) => {
                return Err(TransportError::validation(
                    "bootstrap.servers",
                    "bootstrap.servers is required",
                ))
            }
        };

        // Top-level TLS fields win over their `configs` spellings
        let tls_files = TlsFiles::new(
            document.ca_file.or(overrides.ssl_ca_location.take()),
            document
                .client_cert_file
                .or(overrides.ssl_certificate_location.take()),
            document
                .client_key_file
                .or(overrides.ssl_key_location.take()),
        );
        tls_files.validate()?;

        let topics = match scheme {
            TopicScheme::Fixed => KafkaTopics::Fixed(resolve_fixed_topics(document.topics)?),
            TopicScheme::Wildcard => {
                if document.topics.is_some() {
                    return Err(TransportError::validation(
                        "topics",
                        "topics cannot be set when bootstrapServer selects wildcard topics",
                    ));
                }
                KafkaTopics::Wildcard(WildcardTopics::default())
            }
        };

        let mut properties = KafkaProperties::new(bootstrap_servers);
        properties.apply_overrides(overrides);
        if let Some(group_id) = non_empty(document.group_id) {
            properties.group_id = Some(group_id);
        }

        properties.tls = match tls_files {
            TlsFiles {
                ca_file: Some(ca_location),
                client_cert_file: Some(certificate_location),
                client_key_file: Some(key_location),
            } => Some(KafkaTls {
                ca_location,
                certificate_location,
                key_location,
            }),
            TlsFiles {
                ca_file: Some(ca_file),
                ..
            } => {
                warn!(
                    "Ignoring caFile {} without clientCertFile and clientKeyFile",
                    ca_file
                );
                None
            }
            _ => None,
        };

        Ok(Self { properties, topics })
    }

    pub fn bootstrap_servers(&self) -> &str {
        &self.properties.bootstrap_servers
    }

    pub fn topic_scheme(&self) -> TopicScheme {
        self.topics.scheme()
    }

    /// Fill in the consumer group when the document did not name one
    pub fn with_default_group_id(mut self, group_id: impl Into<String>) -> Self {
        if self.properties.group_id.is_none() {
            self.properties.group_id = Some(group_id.into());
        }
        self
    }

    /// Render the options as the property map a Kafka binding consumes
    ///
    /// Keys are librdkafka property names, except `events.channel.size`
    /// which sizes the binding's own event channel.
    pub fn to_properties(&self) -> BTreeMap<String, PropertyValue> {
        let p = &self.properties;
        let mut map: BTreeMap<String, PropertyValue> = BTreeMap::new();
        let mut set = |key: &str, value: PropertyValue| {
            map.insert(key.to_string(), value);
        };

        set("bootstrap.servers", p.bootstrap_servers.as_str().into());
        set("socket.keepalive.enable", p.socket_keepalive_enable.into());
        set("log.connection.close", p.log_connection_close.into());
        set(
            "ssl.endpoint.identification.algorithm",
            p.ssl_endpoint_identification_algorithm.as_str().into(),
        );
        set("events.channel.size", p.events_channel_size.into());
        set("acks", p.acks.as_str().into());
        set("retries", p.retries.into());
        if let Some(group_id) = &p.group_id {
            set("group.id", group_id.as_str().into());
        }
        set("enable.auto.commit", p.enable_auto_commit.into());
        set("enable.auto.offset.store", p.enable_auto_offset_store.into());
        set(
            "queued.max.messages.kbytes",
            p.queued_max_messages_kbytes.into(),
        );
        set("auto.offset.reset", p.auto_offset_reset.as_str().into());
        set("auto.commit.interval.ms", p.auto_commit_interval_ms.into());

        match (&p.tls, &p.security_protocol) {
            (Some(tls), protocol) => {
                let protocol = protocol.as_deref().unwrap_or(SSL_SECURITY_PROTOCOL);
                set("security.protocol", protocol.into());
                set("ssl.ca.location", tls.ca_location.as_str().into());
                set(
                    "ssl.certificate.location",
                    tls.certificate_location.as_str().into(),
                );
                set("ssl.key.location", tls.key_location.as_str().into());
            }
            (None, Some(protocol)) => set("security.protocol", protocol.as_str().into()),
            (None, None) => {}
        }

        for (key, value) in &p.extra {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

fn resolve_fixed_topics(section: Option<TopicsSection>) -> TransportResult<Topics> {
    let topics = match section {
        None => Topics::default(),
        Some(section) => match (
            non_empty(section.source_events),
            non_empty(section.agent_events),
        ) {
            (Some(source_events), Some(agent_events)) => Topics::new(source_events, agent_events),
            _ => {
                warn!("Incomplete topics section, using default Kafka topics");
                Topics::default()
            }
        },
    };
    topics.validate()?;
    Ok(topics)
}

/// Kafka configuration document as written by users
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KafkaConfigDocument {
    bootstrap_server: Option<String>,
    ca_file: Option<String>,
    client_cert_file: Option<String>,
    client_key_file: Option<String>,
    #[serde(rename = "groupID", alias = "groupId")]
    group_id: Option<String>,
    configs: Option<PropertyOverrides>,
    topics: Option<TopicsSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicsSection {
    source_events: Option<String>,
    agent_events: Option<String>,
}

/// User-supplied property overrides, keyed by their librdkafka names
#[derive(Debug, Default, Deserialize)]
struct PropertyOverrides {
    #[serde(rename = "bootstrap.servers")]
    bootstrap_servers: Option<String>,
    #[serde(rename = "group.id")]
    group_id: Option<String>,
    #[serde(rename = "socket.keepalive.enable")]
    socket_keepalive_enable: Option<bool>,
    #[serde(rename = "log.connection.close")]
    log_connection_close: Option<bool>,
    #[serde(rename = "ssl.endpoint.identification.algorithm")]
    ssl_endpoint_identification_algorithm: Option<String>,
    #[serde(rename = "events.channel.size", alias = "go.events.channel.size")]
    events_channel_size: Option<u32>,
    acks: Option<PropertyValue>,
    retries: Option<u32>,
    #[serde(rename = "enable.auto.commit")]
    enable_auto_commit: Option<bool>,
    #[serde(rename = "enable.auto.offset.store")]
    enable_auto_offset_store: Option<bool>,
    #[serde(rename = "queued.max.messages.kbytes")]
    queued_max_messages_kbytes: Option<u32>,
    #[serde(rename = "auto.offset.reset")]
    auto_offset_reset: Option<OffsetReset>,
    #[serde(rename = "auto.commit.interval.ms")]
    auto_commit_interval_ms: Option<u32>,
    #[serde(rename = "security.protocol")]
    security_protocol: Option<String>,
    #[serde(rename = "ssl.ca.location")]
    ssl_ca_location: Option<String>,
    #[serde(rename = "ssl.certificate.location")]
    ssl_certificate_location: Option<String>,
    #[serde(rename = "ssl.key.location")]
    ssl_key_location: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, PropertyValue>,
}
