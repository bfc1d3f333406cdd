//! gRPC transport options.

use crate::types::{non_empty, TlsFiles};
use crate::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Build gRPC options from a YAML file
pub fn build_grpc_options(path: impl AsRef<Path>) -> TransportResult<GrpcOptions> {
    let document: GrpcConfigDocument = super::read_document(path.as_ref())?;
    GrpcOptions::from_document(document)
}

/// Validated gRPC options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcOptions {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsFiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
}

impl GrpcOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tls: None,
            token_file: None,
        }
    }

    /// Parse and validate an in-memory YAML document
    pub fn from_yaml(content: &str) -> TransportResult<Self> {
        let document: GrpcConfigDocument = super::parse_document(content)?;
        Self::from_document(document)
    }

    fn from_document(document: GrpcConfigDocument) -> TransportResult<Self> {
        let url = non_empty(document.url)
            .ok_or_else(|| TransportError::validation("url", "url is required"))?;

        let tls = TlsFiles::new(
            document.ca_file,
            document.client_cert_file,
            document.client_key_file,
        );
        tls.validate()?;

        Ok(Self {
            url,
            tls: (!tls.is_empty()).then_some(tls),
            token_file: non_empty(document.token_file),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrpcConfigDocument {
    url: Option<String>,
    ca_file: Option<String>,
    client_cert_file: Option<String>,
    client_key_file: Option<String>,
    token_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_url() {
        let opts = GrpcOptions::from_yaml("url: grpc\n").unwrap();
        assert_eq!(opts, GrpcOptions::new("grpc"));
    }

    #[test]
    fn test_url_required() {
        let err = GrpcOptions::from_yaml("tokenFile: /var/run/token\n").unwrap_err();
        assert_eq!(err.field(), Some("url"));
    }

    #[test]
    fn test_tls_and_token() {
        let yaml = r#"
url: broker.example:8090
caFile: /certs/ca.pem
clientCertFile: /certs/client.pem
clientKeyFile: /certs/client-key.pem
tokenFile: /var/run/token
"#;
        let opts = GrpcOptions::from_yaml(yaml).unwrap();
        let tls = opts.tls.as_ref().unwrap();
        assert!(tls.has_client_cert());
        assert_eq!(opts.token_file.as_deref(), Some("/var/run/token"));

        let err = GrpcOptions::from_yaml("url: x\nclientCertFile: c\nclientKeyFile: k\n").unwrap_err();
        assert_eq!(err.field(), Some("caFile"));
    }
}
