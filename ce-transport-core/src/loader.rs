//! Dispatch from a transport name to the matching option builder.

use crate::options::{build_grpc_options, build_kafka_options, build_mqtt_options};
use crate::{TransportKind, TransportOptions, TransportResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads transport options for a transport selected by name
///
/// The loader validates nothing itself: it resolves the transport name and
/// hands the path to that transport's builder, which owns reading the file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    transport_type: String,
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(transport_type: impl Into<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            transport_type: transport_type.into(),
            config_path: config_path.into(),
        }
    }

    pub fn transport_type(&self) -> &str {
        &self.transport_type
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Build the options for the configured transport
    ///
    /// An unsupported transport name fails before the file is touched.
    pub fn load_config(&self) -> TransportResult<(TransportKind, TransportOptions)> {
        let kind: TransportKind = self.transport_type.parse()?;

        info!(
            "Loading {} transport options from {}",
            kind,
            self.config_path.display()
        );

        let options = match kind {
            TransportKind::Kafka => TransportOptions::Kafka(build_kafka_options(&self.config_path)?),
            TransportKind::Mqtt => TransportOptions::Mqtt(build_mqtt_options(&self.config_path)?),
            TransportKind::Grpc => TransportOptions::Grpc(build_grpc_options(&self.config_path)?),
        };

        debug!("Loaded {} transport options", kind);
        Ok((kind, options))
    }
}

/// Build options for `transport_type` from the YAML file at `path`
pub fn build_options_from_file(
    transport_type: &str,
    path: impl AsRef<Path>,
) -> TransportResult<(TransportKind, TransportOptions)> {
    ConfigLoader::new(transport_type, path.as_ref()).load_config()
}
