//! Producer event drain.
//!
//! A transport producer reports message outcomes and client-level failures on
//! an event channel that must be read continuously: once it fills up, every
//! publish stalls. The drain reads that channel for the lifetime of the
//! client, logs failed deliveries, and forwards client-level errors to a
//! channel owned by the caller.
//!
//! The caller must keep reading (or size) the error channel. A full error
//! channel blocks the drain on the next client-level error, and with it the
//! producer's event channel.

use crate::metrics::TransportMetrics;
use crate::{ClientError, ClientErrorKind, DeliveryError, TransportError, TransportResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// Client id used by [`start_drain`] for metric labels
pub const DEFAULT_DRAIN_CLIENT_ID: &str = "ce-transport";

/// Outcome of a single published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
    pub result: Result<(), DeliveryError>,
}

impl DeliveryReport {
    pub fn delivered(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition: Some(partition),
            offset: Some(offset),
            result: Ok(()),
        }
    }

    pub fn failed(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            result: Err(DeliveryError::new(topic.clone(), reason)),
            topic,
            partition: None,
            offset: None,
        }
    }
}

/// Event emitted by a transport producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerEvent {
    /// Per-message delivery report
    Delivery(DeliveryReport),
    /// Instance-level failure: broker connectivity, authentication, ...
    Client(ClientError),
}

impl ProducerEvent {
    pub fn delivered(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self::Delivery(DeliveryReport::delivered(topic, partition, offset))
    }

    pub fn delivery_failed(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery(DeliveryReport::failed(topic, reason))
    }

    pub fn client_error(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self::Client(ClientError::new(kind, message))
    }
}

/// How the drain treats an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClass {
    Delivered,
    /// Recoverable; logged and discarded
    DeliveryFailed(DeliveryError),
    /// Forwarded to the caller's error channel
    Fatal(ClientError),
}

/// Classify a producer event
pub fn classify(event: ProducerEvent) -> EventClass {
    match event {
        ProducerEvent::Delivery(DeliveryReport { result: Ok(()), .. }) => EventClass::Delivered,
        ProducerEvent::Delivery(DeliveryReport {
            result: Err(err), ..
        }) => EventClass::DeliveryFailed(err),
        ProducerEvent::Client(err) => EventClass::Fatal(err),
    }
}

/// Counts of what a drain processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub delivered: u64,
    pub delivery_failures: u64,
    pub client_errors: u64,
    /// Client errors that could not be forwarded because the receiver was gone
    pub errors_dropped: u64,
}

/// Background consumer of a producer's event channel
#[derive(Debug, Clone)]
pub struct EventDrain {
    metrics: TransportMetrics,
}

impl EventDrain {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            metrics: TransportMetrics::new(client_id),
        }
    }

    /// Start draining `events` on the current tokio runtime
    ///
    /// With no event source nothing is spawned and the returned handle is
    /// already finished. Otherwise the task runs until every sender of
    /// `events` is dropped.
    pub fn start(
        self,
        events: Option<mpsc::Receiver<ProducerEvent>>,
        errors: mpsc::Sender<TransportError>,
    ) -> DrainHandle {
        let Some(events) = events else {
            debug!("No producer event source, drain not started");
            return DrainHandle { task: None };
        };

        let task = tokio::spawn(self.run(events, errors));
        DrainHandle { task: Some(task) }
    }

    async fn run(
        self,
        mut events: mpsc::Receiver<ProducerEvent>,
        errors: mpsc::Sender<TransportError>,
    ) -> DrainStats {
        debug!(
            "Producer event drain started for {}",
            self.metrics.client_id()
        );
        let mut stats = DrainStats::default();

        while let Some(event) = events.recv().await {
            match classify(event) {
                EventClass::Delivered => {
                    stats.delivered += 1;
                    self.metrics.record_delivered();
                    trace!("Message delivered");
                }
                EventClass::DeliveryFailed(err) => {
                    stats.delivery_failures += 1;
                    self.metrics.record_delivery_failed();
                    error!("Delivery failed: {}", err);
                }
                EventClass::Fatal(err) => {
                    stats.client_errors += 1;
                    self.metrics.record_client_error();
                    if let Err(mpsc::error::SendError(err)) =
                        errors.send(TransportError::Client(err)).await
                    {
                        stats.errors_dropped += 1;
                        warn!("Error channel closed, dropping {}", err);
                    }
                }
            }
        }

        debug!(
            "Producer event drain stopped for {}: {:?}",
            self.metrics.client_id(),
            stats
        );
        stats
    }
}

/// Start a drain labelled with [`DEFAULT_DRAIN_CLIENT_ID`]
pub fn start_drain(
    events: Option<mpsc::Receiver<ProducerEvent>>,
    errors: mpsc::Sender<TransportError>,
) -> DrainHandle {
    EventDrain::new(DEFAULT_DRAIN_CLIENT_ID).start(events, errors)
}

/// Completion handle of a running drain
#[derive(Debug)]
pub struct DrainHandle {
    task: Option<JoinHandle<DrainStats>>,
}

impl DrainHandle {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the event source to close and the drain to finish
    pub async fn join(self) -> TransportResult<DrainStats> {
        match self.task {
            None => Ok(DrainStats::default()),
            Some(task) => task
                .await
                .map_err(|e| TransportError::fatal_with_source("producer event drain failed", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(ProducerEvent::delivered("spec", 0, 7)),
            EventClass::Delivered
        );
        assert_eq!(
            classify(ProducerEvent::delivery_failed("spec", "message timed out")),
            EventClass::DeliveryFailed(DeliveryError::new("spec", "message timed out"))
        );
        assert_eq!(
            classify(ProducerEvent::client_error(
                ClientErrorKind::Authentication,
                "SASL rejected"
            )),
            EventClass::Fatal(ClientError::new(
                ClientErrorKind::Authentication,
                "SASL rejected"
            ))
        );
    }

    #[tokio::test]
    async fn test_only_client_errors_are_forwarded() {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (error_tx, mut error_rx) = mpsc::channel(4);
        let handle = start_drain(Some(event_rx), error_tx);

        let events = vec![
            ProducerEvent::delivered("spec", 0, 1),
            ProducerEvent::delivered("spec", 0, 2),
            ProducerEvent::delivery_failed("spec", "message timed out"),
            ProducerEvent::client_error(ClientErrorKind::AllBrokersDown, "1/1 brokers are down"),
            ProducerEvent::delivered("spec", 1, 1),
            ProducerEvent::delivery_failed("status", "message too large"),
            ProducerEvent::delivered("status", 0, 9),
            ProducerEvent::delivered("status", 0, 10),
        ];
        for event in events {
            event_tx.send(event).await.unwrap();
        }

        let err = timeout(Duration::from_secs(5), error_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(err.is_client());
        assert!(err.to_string().contains("1/1 brokers are down"));

        // the drain keeps running while its input is open
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(event_tx);
        let stats = timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stats,
            DrainStats {
                delivered: 5,
                delivery_failures: 2,
                client_errors: 1,
                errors_dropped: 0,
            }
        );
        assert!(error_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_no_event_source() {
        let (error_tx, _error_rx) = mpsc::channel(1);
        let handle = start_drain(None, error_tx);

        assert!(handle.is_finished());
        assert_eq!(handle.join().await.unwrap(), DrainStats::default());
    }

    #[tokio::test]
    async fn test_closed_error_channel_does_not_stop_drain() {
        let (event_tx, event_rx) = mpsc::channel(4);
        let (error_tx, error_rx) = mpsc::channel(1);
        drop(error_rx);

        let handle = EventDrain::new("agent-1").start(Some(event_rx), error_tx);
        event_tx
            .send(ProducerEvent::client_error(
                ClientErrorKind::BrokerTransport,
                "connection refused",
            ))
            .await
            .unwrap();
        event_tx
            .send(ProducerEvent::delivered("status", 0, 1))
            .await
            .unwrap();
        drop(event_tx);

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.client_errors, 1);
        assert_eq!(stats.errors_dropped, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_events_processed_in_order() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (error_tx, mut error_rx) = mpsc::channel(8);
        let handle = start_drain(Some(event_rx), error_tx);

        for message in ["first", "second", "third"] {
            event_tx
                .send(ProducerEvent::client_error(ClientErrorKind::Other, message))
                .await
                .unwrap();
        }
        drop(event_tx);
        handle.join().await.unwrap();

        let mut seen = Vec::new();
        while let Some(err) = error_rx.recv().await {
            seen.push(err.to_string());
        }
        assert_eq!(seen.len(), 3);
        assert!(seen[0].ends_with("first"));
        assert!(seen[1].ends_with("second"));
        assert!(seen[2].ends_with("third"));
    }
}
