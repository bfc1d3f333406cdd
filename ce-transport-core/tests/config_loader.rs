//! Loader behaviour across all supported transports.

use ce_transport_core::options::{KafkaTopics, MqttTopics, QoS};
use ce_transport_core::{
    build_options_from_file, ConfigLoader, GrpcOptions, TopicScheme, Topics, TransportError,
    TransportKind, TransportOptions,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const MQTT_CONFIG: &str = r#"
brokerHost: mqtt
topics:
  sourceEvents: sources/hub1/clusters/+/sourceevents
  agentEvents: sources/hub1/clusters/+/agentevents
"#;

const GRPC_CONFIG: &str = "url: grpc\n";

const KAFKA_CONFIG: &str = r#"
configs:
  bootstrap.servers: test
"#;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_mqtt_config() {
    let file = config_file(MQTT_CONFIG);

    let (kind, options) = ConfigLoader::new("mqtt", file.path()).load_config().unwrap();
    assert_eq!(kind, TransportKind::Mqtt);

    let mqtt = options.as_mqtt().unwrap();
    assert_eq!(mqtt.broker_host, "mqtt");
    assert_eq!(
        mqtt.topics,
        MqttTopics {
            source_events: "sources/hub1/clusters/+/sourceevents".to_string(),
            agent_events: "sources/hub1/clusters/+/agentevents".to_string(),
            source_broadcast: None,
            agent_broadcast: None,
        }
    );
    assert_eq!(mqtt.keep_alive, 60);
    assert_eq!(mqtt.pub_qos, QoS::AtLeastOnce);
    assert_eq!(mqtt.sub_qos, QoS::AtLeastOnce);
    assert_eq!(mqtt.dial_timeout, Duration::from_secs(60));
}

#[test]
fn test_load_grpc_config() {
    let file = config_file(GRPC_CONFIG);

    let (kind, options) = ConfigLoader::new("grpc", file.path()).load_config().unwrap();
    assert_eq!(kind, TransportKind::Grpc);
    assert_eq!(options, TransportOptions::Grpc(GrpcOptions::new("grpc")));
}

#[test]
fn test_load_kafka_config() {
    let file = config_file(KAFKA_CONFIG);

    let (kind, options) = ConfigLoader::new("kafka", file.path()).load_config().unwrap();
    assert_eq!(kind, TransportKind::Kafka);
    assert_eq!(options.topic_scheme(), Some(TopicScheme::Fixed));

    let kafka = options.as_kafka().unwrap();
    assert_eq!(kafka.bootstrap_servers(), "test");
    assert_eq!(kafka.topics, KafkaTopics::Fixed(Topics::new("spec", "status")));
}

#[test]
fn test_kafka_full_tls_via_entry_point() {
    let file = config_file(
        r#"
bootstrapServer: broker:9093
caFile: /certs/ca.pem
clientCertFile: /certs/client.pem
clientKeyFile: /certs/client-key.pem
"#,
    );

    let (_, options) = build_options_from_file("kafka", file.path()).unwrap();
    let properties = options.as_kafka().unwrap().to_properties();

    assert_eq!(properties["security.protocol"].to_string(), "ssl");
    assert_eq!(properties["ssl.ca.location"].to_string(), "/certs/ca.pem");
    assert_eq!(
        properties["ssl.certificate.location"].to_string(),
        "/certs/client.pem"
    );
    assert_eq!(
        properties["ssl.key.location"].to_string(),
        "/certs/client-key.pem"
    );
    assert_eq!(options.topic_scheme(), Some(TopicScheme::Wildcard));
}

#[test]
fn test_unsupported_transport() {
    let file = config_file(KAFKA_CONFIG);

    let err = build_options_from_file("carrier-pigeon", file.path()).unwrap_err();
    assert!(matches!(err, TransportError::UnsupportedTransport(_)));
    assert!(!err.is_config());
}

#[test]
fn test_wrong_document_for_transport() {
    let file = config_file(GRPC_CONFIG);

    let err = build_options_from_file("kafka", file.path()).unwrap_err();
    assert_eq!(err.field(), Some("bootstrap.servers"));
}
