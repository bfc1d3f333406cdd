//! CloudEvents client construction.
//!
//! A [`BindingFactory`] turns validated options into a protocol binding for
//! one transport; [`new_client`] wraps that binding in a
//! [`CloudEventsClient`]. Starting the producer event drain is a separate
//! step the caller takes once it has a client and an error channel.

use crate::event::CloudEvent;
use crate::{TopicScheme, TransportError, TransportKind, TransportOptions, TransportResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Wire-level binding for one transport
#[async_trait]
pub trait ProtocolBinding: Send + Sync {
    /// Publish an event to a concrete topic
    async fn send(&self, topic: &str, event: &CloudEvent) -> TransportResult<()>;

    /// Flush and release the connection; closes the producer event channel
    async fn close(&self) -> TransportResult<()>;
}

/// Builds protocol bindings from options
#[cfg_attr(test, mockall::automock)]
pub trait BindingFactory: Send + Sync {
    /// Transport the bindings speak
    fn kind(&self) -> TransportKind;

    /// Topic generation the bindings address, if the transport has several
    fn topic_scheme(&self) -> Option<TopicScheme> {
        None
    }

    /// Construct a binding; construction errors reach the caller unchanged
    fn bind(&self, options: Arc<TransportOptions>) -> TransportResult<Box<dyn ProtocolBinding>>;
}

/// Client handle publishing CloudEvents over a protocol binding
pub struct CloudEventsClient {
    options: Arc<TransportOptions>,
    binding: Box<dyn ProtocolBinding>,
}

impl std::fmt::Debug for CloudEventsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudEventsClient")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl CloudEventsClient {
    pub fn kind(&self) -> TransportKind {
        self.options.kind()
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub async fn publish(&self, topic: &str, event: &CloudEvent) -> TransportResult<()> {
        debug!(
            "Publishing event {} of type {} to {}",
            event.id, event.event_type, topic
        );
        self.binding.send(topic, event).await
    }

    pub async fn close(self) -> TransportResult<()> {
        info!("Closing {} client", self.kind());
        self.binding.close().await
    }
}

/// Create a client for `options` using bindings from `factory`
pub fn new_client(
    factory: &dyn BindingFactory,
    options: TransportOptions,
) -> TransportResult<CloudEventsClient> {
    let kind = options.kind();
    if factory.kind() != kind {
        return Err(TransportError::config(format!(
            "{} binding cannot be built from {} options",
            factory.kind(),
            kind
        )));
    }

    if let (Some(expected), Some(found)) = (factory.topic_scheme(), options.topic_scheme()) {
        if expected != found {
            return Err(TransportError::TopicSchemeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }

    let options = Arc::new(options);
    let binding = factory.bind(Arc::clone(&options))?;
    info!("Created {} CloudEvents client", kind);

    Ok(CloudEventsClient { options, binding })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{GrpcOptions, KafkaOptions};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBinding {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ProtocolBinding for RecordingBinding {
        async fn send(&self, topic: &str, event: &CloudEvent) -> TransportResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), event.id.clone()));
            Ok(())
        }

        async fn close(&self) -> TransportResult<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn fixed_kafka_options() -> TransportOptions {
        TransportOptions::Kafka(
            KafkaOptions::from_yaml("configs:\n  bootstrap.servers: broker:9092\n").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_client_publishes_through_binding() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));

        let mut factory = MockBindingFactory::new();
        factory.expect_kind().return_const(TransportKind::Kafka);
        factory
            .expect_topic_scheme()
            .return_const(Some(TopicScheme::Fixed));
        let (sent_c, closed_c) = (Arc::clone(&sent), Arc::clone(&closed));
        factory.expect_bind().times(1).returning(move |options| {
            assert_eq!(options.kind(), TransportKind::Kafka);
            Ok(Box::new(RecordingBinding {
                sent: Arc::clone(&sent_c),
                closed: Arc::clone(&closed_c),
            }) as Box<dyn ProtocolBinding>)
        });

        let client = new_client(&factory, fixed_kafka_options()).unwrap();
        assert_eq!(client.kind(), TransportKind::Kafka);

        let topic = client.options().as_kafka().unwrap().topics.source_events().to_string();
        let event = CloudEvent::new("hub1", "manifests.spec.create_request").with_id("ev-1");
        client.publish(&topic, &event).await.unwrap();
        client.close().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![("spec".to_string(), "ev-1".to_string())]
        );
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_binding_error_is_returned_unchanged() {
        let mut factory = MockBindingFactory::new();
        factory.expect_kind().return_const(TransportKind::Grpc);
        factory.expect_topic_scheme().return_const(None::<TopicScheme>);
        factory
            .expect_bind()
            .returning(|_| Err(TransportError::validation("url", "malformed url")));

        let err = new_client(&factory, TransportOptions::Grpc(GrpcOptions::new("::"))).unwrap_err();
        assert_eq!(err.field(), Some("url"));
        assert!(err.to_string().contains("malformed url"));
    }

    #[test]
    fn test_topic_scheme_mismatch_is_rejected() {
        let mut factory = MockBindingFactory::new();
        factory.expect_kind().return_const(TransportKind::Kafka);
        factory
            .expect_topic_scheme()
            .return_const(Some(TopicScheme::Wildcard));
        factory.expect_bind().never();

        let err = new_client(&factory, fixed_kafka_options()).unwrap_err();
        assert!(matches!(
            err,
            TransportError::TopicSchemeMismatch { ref expected, ref found }
                if expected == "wildcard" && found == "fixed"
        ));
    }

    #[test]
    fn test_transport_kind_mismatch_is_rejected() {
        let mut factory = MockBindingFactory::new();
        factory.expect_kind().return_const(TransportKind::Mqtt);
        factory.expect_topic_scheme().return_const(None::<TopicScheme>);
        factory.expect_bind().never();

        let err = new_client(&factory, fixed_kafka_options()).unwrap_err();
        assert!(matches!(err, TransportError::Config { .. }));
    }
}
