//! # CE Transport Core
//!
//! Transport configuration and producer supervision for CloudEvents clients
//! exchanging events between a hub and remote agents over Kafka, MQTT or gRPC.
//!
//! ## Overview
//!
//! - **Config loading**: [`ConfigLoader`] maps a transport name and a YAML
//!   document to validated [`TransportOptions`]
//! - **Client construction**: [`new_client`] wraps a protocol binding built
//!   from those options in a [`CloudEventsClient`]
//! - **Producer event drain**: [`start_drain`] keeps a producer's event
//!   channel from backing up and forwards client-level errors to the caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ce_transport_core::{start_drain, ConfigLoader, ProducerEvent, TransportResult};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> TransportResult<()> {
//! let (kind, options) = ConfigLoader::new("kafka", "/etc/transport/kafka.yaml").load_config()?;
//! println!("{} options: {:?}", kind, options);
//!
//! // Events come from the protocol binding's producer
//! let (event_tx, event_rx) = mpsc::channel::<ProducerEvent>(1000);
//! let (error_tx, mut error_rx) = mpsc::channel(100);
//! let drain = start_drain(Some(event_rx), error_tx);
//!
//! tokio::spawn(async move {
//!     while let Some(err) = error_rx.recv().await {
//!         eprintln!("transport failure: {}", err);
//!     }
//! });
//!
//! drop(event_tx); // the binding closes its event channel on shutdown
//! let stats = drain.join().await?;
//! println!("{} messages delivered", stats.delivered);
//! # Ok(())
//! # }
//! ```

mod client;
mod drain;
mod error;
mod event;
mod loader;
mod metrics;
pub mod options;
mod settings;
mod types;

// Re-export public API
pub use client::{new_client, BindingFactory, CloudEventsClient, ProtocolBinding};
pub use drain::{
    classify, start_drain, DeliveryReport, DrainHandle, DrainStats, EventClass, EventDrain,
    ProducerEvent, DEFAULT_DRAIN_CLIENT_ID,
};
pub use error::{
    ClientError, ClientErrorKind, DeliveryError, TransportError, TransportResult,
};
pub use event::CloudEvent;
pub use loader::{build_options_from_file, ConfigLoader};
pub use metrics::TransportMetrics;
pub use options::{GrpcOptions, KafkaOptions, MqttOptions};
pub use settings::TransportSettings;
pub use types::{
    PropertyValue, TlsFiles, TopicScheme, Topics, TransportKind, TransportOptions,
    DEFAULT_AGENT_EVENTS_TOPIC, DEFAULT_SOURCE_EVENTS_TOPIC,
};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
