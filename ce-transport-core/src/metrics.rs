//! Counters for producer event outcomes.
//!
//! Counters go through the `metrics` facade; the embedding process decides
//! whether a recorder is installed.

use ::metrics::counter;

pub const DELIVERIES_TOTAL: &str = "ce_transport_deliveries_total";
pub const CLIENT_ERRORS_TOTAL: &str = "ce_transport_client_errors_total";

/// Per-client transport counters
#[derive(Debug, Clone)]
pub struct TransportMetrics {
    client_id: String,
}

impl TransportMetrics {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn record_delivered(&self) {
        counter!(DELIVERIES_TOTAL, "client" => self.client_id.clone(), "outcome" => "success")
            .increment(1);
    }

    pub fn record_delivery_failed(&self) {
        counter!(DELIVERIES_TOTAL, "client" => self.client_id.clone(), "outcome" => "failure")
            .increment(1);
    }

    pub fn record_client_error(&self) {
        counter!(CLIENT_ERRORS_TOTAL, "client" => self.client_id.clone()).increment(1);
    }
}
