//! Message construction and publish options.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Broker receipt for a publish. One receipt acknowledges an entire batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId {
    pub ledger_id: u64,
    pub entry_id: u64,
    pub partition: i32,
    pub batch_index: i32,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.ledger_id, self.entry_id, self.partition, self.batch_index
        )
    }
}

/// A message ready for the wire, immutable once constructed.
///
/// Timestamps are epoch milliseconds, matching the broker's metadata fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerMessage {
    /// Broker-assigned numeric handle for this producer on its connection.
    pub producer_id: u64,
    /// Broker-assigned producer name.
    pub producer_name: String,
    /// Strictly monotonic within a single producer lifetime.
    pub sequence_id: u64,
    pub payload: Bytes,
    pub properties: HashMap<String, String>,
    pub partition_key: Option<String>,
    pub ordering_key: Option<Bytes>,
    pub event_time: Option<u64>,
    /// Absolute delivery time for deferred messages. A message carrying this
    /// never rides a batch.
    pub deliver_at_time: Option<u64>,
}

/// One publish option in the ordered, keyword-like form.
///
/// [`MessageOptions::from_opts`] normalises a sequence of these into the
/// mapping form; later entries overwrite earlier ones.
#[derive(Debug, Clone)]
pub enum MessageOpt {
    Properties(HashMap<String, String>),
    PartitionKey(String),
    OrderingKey(Bytes),
    EventTime(SystemTime),
    DeliverAt(SystemTime),
    Delay(Duration),
}

/// Normalised publish options.
///
/// `delay` is a convenience for `deliver_at`: it resolves to `now + delay`
/// when the message is built, and wins when both are supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub properties: HashMap<String, String>,
    pub partition_key: Option<String>,
    pub ordering_key: Option<Bytes>,
    pub event_time: Option<SystemTime>,
    pub deliver_at: Option<SystemTime>,
    pub delay: Option<Duration>,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise an ordered option sequence into the mapping form.
    pub fn from_opts<I: IntoIterator<Item = MessageOpt>>(opts: I) -> Self {
        let mut normalised = Self::default();
        for opt in opts {
            match opt {
                MessageOpt::Properties(props) => normalised.properties = props,
                MessageOpt::PartitionKey(key) => normalised.partition_key = Some(key),
                MessageOpt::OrderingKey(key) => normalised.ordering_key = Some(key),
                MessageOpt::EventTime(at) => normalised.event_time = Some(at),
                MessageOpt::DeliverAt(at) => normalised.deliver_at = Some(at),
                MessageOpt::Delay(delay) => normalised.delay = Some(delay),
            }
        }
        normalised
    }

    /// Replace the property map.
    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Add a single property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Key used to route this message to a partition.
    pub fn partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Key used to group messages for ordered dispatch on the consumer side.
    pub fn ordering_key(mut self, key: impl Into<Bytes>) -> Self {
        self.ordering_key = Some(key.into());
        self
    }

    /// Application-supplied event timestamp.
    pub fn event_time(mut self, at: SystemTime) -> Self {
        self.event_time = Some(at);
        self
    }

    /// Deliver no earlier than the given wall-clock time.
    pub fn deliver_at(mut self, at: SystemTime) -> Self {
        self.deliver_at = Some(at);
        self
    }

    /// Deliver no earlier than `delay` from the time of publish.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Resolve the absolute delivery time. `delay` wins over `deliver_at`.
    pub(crate) fn deliver_at_millis(&self, now: SystemTime) -> Option<u64> {
        match (self.delay, self.deliver_at) {
            (Some(delay), _) => Some(epoch_millis(now + delay)),
            (None, Some(at)) => Some(epoch_millis(at)),
            (None, None) => None,
        }
    }
}

impl FromIterator<MessageOpt> for MessageOptions {
    fn from_iter<I: IntoIterator<Item = MessageOpt>>(opts: I) -> Self {
        Self::from_opts(opts)
    }
}

pub(crate) fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Build the next message for a producer.
///
/// Pure: the caller passes `now` and commits the sequence increment itself,
/// so nothing here can suspend or observe state it does not own.
pub(crate) fn build_message(
    producer_id: u64,
    producer_name: &str,
    sequence_id: u64,
    payload: Bytes,
    opts: &MessageOptions,
    now: SystemTime,
) -> ProducerMessage {
    ProducerMessage {
        producer_id,
        producer_name: producer_name.to_string(),
        sequence_id,
        payload,
        properties: opts.properties.clone(),
        partition_key: opts.partition_key.clone(),
        ordering_key: opts.ordering_key.clone(),
        event_time: opts.event_time.map(epoch_millis),
        deliver_at_time: opts.deliver_at_millis(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_700_000_000_000)
    }

    #[test]
    fn test_ordered_opts_match_mapping_form() {
        let ordered = MessageOptions::from_opts([
            MessageOpt::PartitionKey("k".into()),
            MessageOpt::Properties(HashMap::from([("a".into(), "1".into())])),
            MessageOpt::EventTime(now()),
        ]);
        let mapped = MessageOptions::new()
            .partition_key("k")
            .properties(HashMap::from([("a".into(), "1".into())]))
            .event_time(now());

        let build = |opts: &MessageOptions| {
            build_message(7, "producer-7", 42, Bytes::from_static(b"payload"), opts, now())
        };
        assert_eq!(build(&ordered), build(&mapped));
    }

    #[test]
    fn test_later_opts_win() {
        let opts = MessageOptions::from_opts([
            MessageOpt::PartitionKey("first".into()),
            MessageOpt::PartitionKey("second".into()),
        ]);
        assert_eq!(opts.partition_key.as_deref(), Some("second"));
    }

    #[test]
    fn test_delay_wins_over_deliver_at() {
        let opts = MessageOptions::new()
            .deliver_at(now() + Duration::from_secs(60))
            .delay(Duration::from_secs(5));
        assert_eq!(
            opts.deliver_at_millis(now()),
            Some(epoch_millis(now()) + 5_000)
        );
    }

    #[test]
    fn test_plain_publish_has_no_delivery_time() {
        assert_eq!(MessageOptions::new().deliver_at_millis(now()), None);
    }

    #[test]
    fn test_build_populates_wire_fields() {
        let opts = MessageOptions::new()
            .property("origin", "unit")
            .delay(Duration::from_secs(2));
        let msg = build_message(9, "producer-9", 100, Bytes::from_static(b"x"), &opts, now());

        assert_eq!(msg.producer_id, 9);
        assert_eq!(msg.producer_name, "producer-9");
        assert_eq!(msg.sequence_id, 100);
        assert_eq!(msg.deliver_at_time, Some(epoch_millis(now()) + 2_000));
        assert_eq!(msg.properties["origin"], "unit");
        assert_eq!(msg.event_time, None);
    }
}
