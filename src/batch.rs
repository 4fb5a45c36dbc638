//! FIFO of messages awaiting a batched dispatch.

use crate::error::ProducerError;
use crate::message::{MessageId, ProducerMessage};
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// One-shot sink a blocking caller waits on. `None` marks fire-and-forget.
pub(crate) type ReplyHandle = oneshot::Sender<Result<MessageId, ProducerError>>;

/// Strict-FIFO queue of `(message, reply handle)` pairs awaiting dispatch.
///
/// Insertion order is the broker-visible send order and must not be
/// permuted. Between actor turns the queue holds fewer entries than the
/// configured batch size; reaching it triggers an immediate drain.
pub(crate) struct BatchQueue {
    entries: VecDeque<(ProducerMessage, Option<ReplyHandle>)>,
}

impl BatchQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, message: ProducerMessage, reply: Option<ReplyHandle>) {
        self.entries.push_back((message, reply));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain everything, preserving insertion order in both sequences.
    pub(crate) fn drain(&mut self) -> (Vec<ProducerMessage>, Vec<Option<ReplyHandle>>) {
        self.entries.drain(..).unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn message(seq: u64, payload: &'static [u8]) -> ProducerMessage {
        ProducerMessage {
            producer_id: 1,
            producer_name: "producer-1".to_string(),
            sequence_id: seq,
            payload: Bytes::from_static(payload),
            properties: HashMap::new(),
            partition_key: None,
            ordering_key: None,
            event_time: None,
            deliver_at_time: None,
        }
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        let mut queue = BatchQueue::with_capacity(4);
        let (tx, _rx) = oneshot::channel();
        queue.push(message(1, b"a"), None);
        queue.push(message(2, b"b"), Some(tx));
        queue.push(message(3, b"c"), None);
        assert_eq!(queue.len(), 3);

        let (messages, replies) = queue.drain();
        let payloads: Vec<_> = messages.iter().map(|m| m.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"a".as_ref(), b"b".as_ref(), b"c".as_ref()]);
        assert!(replies[0].is_none());
        assert!(replies[1].is_some());
        assert!(replies[2].is_none());
        assert!(queue.is_empty());
    }
}
