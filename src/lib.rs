//! Partitioned producer core for Apache Pulsar.
//!
//! One lightweight actor per topic partition accepts publish requests,
//! optionally coalesces them into server-side batches, dispatches them over
//! a shared broker connection and re-verifies the topic's owning broker in
//! the background. Ordering and sequence-id guarantees are per partition.
//!
//! The wire protocol itself is a seam: plug the transport in through the
//! [`Connection`] and [`ConnectionManager`] traits.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pulsar_producer::{
//!     ConnectionManager, HttpLookup, LookupConfig, MessageOptions, ProducerBuilder, Topic,
//! };
//!
//! # async fn example(manager: impl ConnectionManager) -> Result<(), Box<dyn std::error::Error>> {
//! let lookup = HttpLookup::new(LookupConfig {
//!     brokers: vec!["broker-1.example.com".to_string()],
//!     admin_port: 8080,
//! })?;
//! let topic = Topic::parse("persistent://tenant/ns/events-partition-0")?;
//!
//! let producer = ProducerBuilder::new(topic, lookup, manager)
//!     .batching(true)
//!     .batch_size(100)
//!     .create()
//!     .await?;
//!
//! let id = producer.produce(&b"hello"[..], MessageOptions::new()).await?;
//! println!("acknowledged as {id}");
//! # Ok(())
//! # }
//! ```

mod actor;
mod batch;
mod binder;
mod connection;
mod error;
mod lookup;
mod message;
mod producer;
mod topic;

pub use connection::{
    Connection, ConnectionManager, ConnectionStatus, ProducerCreated, ProducerOptions,
};
pub use error::{ConnectionError, ExitReason, LookupError, ProducerError};
pub use lookup::{BrokerAddress, HttpLookup, LookupConfig, LookupService};
pub use message::{MessageId, MessageOpt, MessageOptions, ProducerMessage};
pub use producer::{Producer, ProducerBuilder};
pub use topic::{InvalidTopic, Topic};
