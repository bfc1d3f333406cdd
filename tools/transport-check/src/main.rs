//! Transport configuration check
//!
//! Loads the transport selected by the process settings, validates its YAML
//! document, and prints the resolved options as JSON. Exits non-zero with the
//! offending field named when the document is invalid.

use anyhow::Context;
use ce_transport_core::{ConfigLoader, TransportOptions, TransportSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let settings = TransportSettings::load().context("failed to load transport settings")?;

    // Initialize logging
    init_tracing(&settings.log_level);

    tracing::info!("Starting transport check");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Transport: {}", settings.transport_type);
    tracing::info!("Config file: {}", settings.config_file.display());

    let (kind, options) = ConfigLoader::new(&settings.transport_type, &settings.config_file)
        .load_config()
        .map_err(|e| {
            tracing::error!("Failed to load transport options: {}", e);
            e
        })?;

    let options = match options {
        TransportOptions::Kafka(kafka) => {
            TransportOptions::Kafka(kafka.with_default_group_id(settings.client_id.clone()))
        }
        other => other,
    };

    tracing::info!("Resolved {} options", kind);
    println!("{}", serde_json::to_string_pretty(&options)?);

    if let Some(kafka) = options.as_kafka() {
        tracing::info!("Kafka topic scheme: {}", kafka.topic_scheme());
        println!("{}", serde_json::to_string_pretty(&kafka.to_properties())?);
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
