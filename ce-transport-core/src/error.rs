//! Error types for transport configuration and runtime supervision.
//!
//! Everything that can be detected before a client exists (unreadable files,
//! invalid documents, unknown transports) is returned synchronously as a
//! [`TransportError`]. Client-level failures observed after the client is
//! running travel over the caller's error channel as [`TransportError::Client`].

use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used across the crate
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors produced while building options or supervising a client
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configuration file could not be read or parsed
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A required field is missing or fields are inconsistent
    #[error("invalid configuration ({field}): {message}")]
    Validation { field: String, message: String },

    /// The transport kind is not one of the supported transports
    #[error("unsupported transport type {0:?}")]
    UnsupportedTransport(String),

    /// Options were built for one topic-naming generation but the binding expects another
    #[error("topic scheme mismatch: binding expects {expected} topics, options use {found} topics")]
    TopicSchemeMismatch { expected: String, found: String },

    /// Client-level failure reported asynchronously by the transport
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Unrecoverable internal failure
    #[error("fatal error: {message}")]
    Fatal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl TransportError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error wrapping its cause
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fatal error wrapping its cause
    pub fn fatal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fatal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The field named by a validation error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Check if the error was caused by the configuration document
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Validation { .. })
    }

    /// Check if the error is a client-level runtime failure
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}

/// Category of a client-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// A broker connection failed or was lost
    BrokerTransport,
    /// Every known broker is unreachable
    AllBrokersDown,
    /// SASL or TLS authentication was rejected
    Authentication,
    /// Any other instance-level failure
    Other,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BrokerTransport => "broker transport failure",
            Self::AllBrokersDown => "all brokers down",
            Self::Authentication => "authentication failure",
            Self::Other => "client failure",
        };
        f.write_str(name)
    }
}

/// Failure describing the health of the client session itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Failure of a single published message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery to {topic} failed: {reason}")]
pub struct DeliveryError {
    pub topic: String,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}
