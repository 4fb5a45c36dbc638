//! Broker connection seam.
//!
//! The wire codec and TCP session live outside this crate. The producer core
//! talks to them through these traits: a connection is a multiplexed session
//! shared by many producers, keyed internally by the server-assigned
//! `producer_id`, and a manager hands out per-broker connections. Both are
//! generic seams so the actor is testable without a broker.

use crate::error::ConnectionError;
use crate::lookup::BrokerAddress;
use crate::message::{MessageId, ProducerMessage};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::watch;

/// Liveness of a broker connection, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Up,
    /// The connection asked its producers to terminate gracefully.
    Closing,
    /// The connection is gone.
    Down,
}

/// Broker-side producer options, forwarded verbatim on registration.
#[derive(Debug, Clone, Default)]
pub struct ProducerOptions {
    /// Requested producer name; the broker assigns one when absent.
    pub producer_name: Option<String>,
    /// Requested access mode. Recorded from the reply, never negotiated.
    pub access_mode: Option<i32>,
    /// Producer metadata visible to broker tooling.
    pub properties: HashMap<String, String>,
}

/// Server reply to a producer registration.
#[derive(Debug, Clone)]
pub struct ProducerCreated {
    pub producer_id: u64,
    pub producer_name: String,
    pub access_mode: i32,
    /// Highest sequence id the broker has seen under this producer name;
    /// the producer's own numbering continues from here.
    pub last_sequence_id: u64,
    pub max_message_size: usize,
    /// Server-returned producer properties.
    pub properties: HashMap<String, String>,
}

/// A multiplexed broker connection.
pub trait Connection: Clone + Send + Sync + 'static {
    /// Register a producer on this connection.
    fn create_producer(
        &self,
        topic_name: &str,
        opts: &ProducerOptions,
    ) -> impl Future<Output = Result<ProducerCreated, ConnectionError>> + Send;

    /// Publish a single message.
    fn send_message(
        &self,
        msg: ProducerMessage,
    ) -> impl Future<Output = Result<MessageId, ConnectionError>> + Send;

    /// Publish a batch in one round trip. The single receipt acknowledges
    /// every message in the batch.
    fn send_messages(
        &self,
        msgs: Vec<ProducerMessage>,
    ) -> impl Future<Output = Result<MessageId, ConnectionError>> + Send;

    /// Liveness signal. Also carries the connection's close directive.
    fn status(&self) -> watch::Receiver<ConnectionStatus>;
}

/// Per-broker connection pool.
///
/// Checked out only while a producer is being created; the producer keeps
/// the connection handle it was given and the pool is released immediately.
pub trait ConnectionManager: Send + Sync + 'static {
    type Conn: Connection;

    fn checkout(
        &self,
        broker: &BrokerAddress,
    ) -> impl Future<Output = Result<Self::Conn, ConnectionError>> + Send;
}
