//! Error types for the producer core.

use crate::lookup::BrokerAddress;
use thiserror::Error;

/// Errors from the admin lookup service.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no bootstrap brokers configured")]
    NoBrokers,

    #[error("lookup returned status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("lookup response carried no broker url")]
    MissingBrokerUrl,

    #[error("invalid broker url: {0}")]
    InvalidBrokerUrl(String),

    #[error("lookup response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("timeout")]
    Timeout,
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Network(err)
        }
    }
}

/// Errors surfaced by the broker connection seam.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,

    #[error("broker error: {0}")]
    Broker(String),

    #[error("i/o error: {0}")]
    Io(String),
}

/// Errors returned to publish callers.
///
/// Clone-able: a batched dispatch yields a single result that fans out to
/// every caller waiting on that batch. Lower-layer errors collapse to their
/// message string at this boundary.
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    #[error("topic lookup failed: {0}")]
    LookupFailed(String),

    #[error("broker refused producer creation: {0}")]
    CreateProducerFailed(String),

    #[error("connection to broker lost")]
    ConnectionDown,

    #[error("topic moved to broker {0}")]
    BrokerChanged(BrokerAddress),

    #[error("producer closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

impl From<LookupError> for ProducerError {
    fn from(err: LookupError) -> Self {
        ProducerError::LookupFailed(err.to_string())
    }
}

/// Terminal reason published by a producer actor when it exits.
///
/// A supervisor watching [`Producer::terminated`](crate::Producer::terminated)
/// uses this to decide whether to recreate the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Orderly shutdown: a close directive, or every handle was dropped.
    Closed,
    /// The shared broker connection died.
    ConnectionDown,
    /// A refresh observed the topic owned by a different broker.
    BrokerChanged(BrokerAddress),
    /// A periodic lookup failed.
    LookupFailed(String),
}

impl ExitReason {
    /// Orderly exits skip the termination hold-down.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExitReason::Closed)
    }
}
