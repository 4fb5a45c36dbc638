//! The per-partition producer actor.
//!
//! One tokio task owns the producer state exclusively and serialises every
//! event that can touch it: publish commands, flush and refresh ticks, the
//! connection liveness watch and the close directive. While a dispatch is in
//! flight the loop is suspended on it and admits nothing else; that
//! suspension is the producer's flow-control point.

use crate::batch::{BatchQueue, ReplyHandle};
use crate::binder::{self, Binding};
use crate::connection::{Connection, ConnectionStatus};
use crate::error::{ExitReason, ProducerError};
use crate::lookup::{BrokerAddress, LookupService};
use crate::message::{self, MessageOptions};
use crate::topic::Topic;
use bytes::Bytes;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

/// Commands accepted by the actor.
pub(crate) enum Command {
    Publish {
        payload: Bytes,
        opts: MessageOptions,
        /// `None` marks a fire-and-forget publish.
        reply: Option<ReplyHandle>,
    },
    Close,
}

/// Knobs resolved by the builder; floors and caps already applied.
pub(crate) struct ProducerConfig {
    pub(crate) batch_enabled: bool,
    pub(crate) batch_size: usize,
    pub(crate) flush_interval: Duration,
    pub(crate) refresh_interval: Duration,
    pub(crate) termination_timeout: Duration,
}

/// Per-producer state. Mutated only by the owning actor task; no lock.
pub(crate) struct ProducerState {
    pub(crate) producer_id: u64,
    pub(crate) producer_name: String,
    pub(crate) last_sequence_id: u64,
}

pub(crate) struct ProducerActor<C, L> {
    topic: Topic,
    config: ProducerConfig,
    state: ProducerState,
    broker: BrokerAddress,
    connection: C,
    lookup: L,
    queue: BatchQueue,
    commands: mpsc::UnboundedReceiver<Command>,
    exit_tx: watch::Sender<Option<ExitReason>>,
}

impl<C, L> ProducerActor<C, L>
where
    C: Connection,
    L: LookupService,
{
    pub(crate) fn new(
        topic: Topic,
        config: ProducerConfig,
        binding: Binding<C>,
        lookup: L,
        commands: mpsc::UnboundedReceiver<Command>,
        exit_tx: watch::Sender<Option<ExitReason>>,
    ) -> Self {
        let queue = BatchQueue::with_capacity(config.batch_size);
        let state = ProducerState {
            producer_id: binding.created.producer_id,
            producer_name: binding.created.producer_name,
            last_sequence_id: binding.created.last_sequence_id,
        };
        Self {
            topic,
            config,
            state,
            broker: binding.broker,
            connection: binding.connection,
            lookup,
            queue,
            commands,
            exit_tx,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut status = self.connection.status();

        let flush = time::sleep(self.config.flush_interval);
        tokio::pin!(flush);
        let refresh = time::sleep(binder::refresh_delay(self.config.refresh_interval));
        tokio::pin!(refresh);

        let reason = loop {
            tokio::select! {
                _ = flush.as_mut(), if self.config.batch_enabled => {
                    if !self.queue.is_empty() {
                        self.dispatch_batch().await;
                    }
                    flush.as_mut().reset(Instant::now() + self.config.flush_interval);
                }
                _ = refresh.as_mut() => {
                    match self.lookup.lookup(&self.topic).await {
                        Ok(broker) if broker == self.broker => {
                            tracing::debug!(topic = %self.topic, broker = %broker, "ownership unchanged");
                            let delay = binder::refresh_delay(self.config.refresh_interval);
                            refresh.as_mut().reset(Instant::now() + delay);
                        }
                        Ok(broker) => break ExitReason::BrokerChanged(broker),
                        Err(err) => break ExitReason::LookupFailed(err.to_string()),
                    }
                }
                changed = status.changed() => {
                    match changed {
                        Ok(()) => match *status.borrow_and_update() {
                            ConnectionStatus::Up => {}
                            ConnectionStatus::Closing => break ExitReason::Closed,
                            ConnectionStatus::Down => break ExitReason::ConnectionDown,
                        },
                        // The connection dropped its status sender.
                        Err(_) => break ExitReason::ConnectionDown,
                    }
                }
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Publish { payload, opts, reply }) => {
                            self.handle_publish(payload, opts, reply).await;
                        }
                        // `None`: every handle was dropped.
                        Some(Command::Close) | None => break ExitReason::Closed,
                    }
                }
            }
        };

        self.terminate(reason).await;
    }

    async fn handle_publish(
        &mut self,
        payload: Bytes,
        opts: MessageOptions,
        reply: Option<ReplyHandle>,
    ) {
        let msg = message::build_message(
            self.state.producer_id,
            &self.state.producer_name,
            self.state.last_sequence_id + 1,
            payload,
            &opts,
            SystemTime::now(),
        );
        self.state.last_sequence_id = msg.sequence_id;

        // Deferred messages always take the direct path: the broker holds
        // each one individually until its delivery time.
        if !self.config.batch_enabled || msg.deliver_at_time.is_some() {
            let result = self
                .connection
                .send_message(msg)
                .await
                .map_err(|err| ProducerError::SendFailed(err.to_string()));
            if let Err(err) = &result {
                tracing::debug!(topic = %self.topic, error = %err, "send failed");
            }
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
            return;
        }

        self.queue.push(msg, reply);
        if self.queue.len() >= self.config.batch_size {
            self.dispatch_batch().await;
        }
    }

    /// Drain the queue, dispatch it in one `send_messages` round trip and fan
    /// the single receipt out to every waiting caller.
    async fn dispatch_batch(&mut self) {
        let (messages, replies) = self.queue.drain();
        let result = self
            .connection
            .send_messages(messages)
            .await
            .map_err(|err| ProducerError::SendFailed(err.to_string()));
        if let Err(err) = &result {
            tracing::debug!(topic = %self.topic, error = %err, "batch send failed");
        }
        for reply in replies.into_iter().flatten() {
            // An orphaned handle (caller timed out) makes this a no-op.
            let _ = reply.send(result.clone());
        }
    }

    /// Fast-fail whatever is still queued, classify the exit and publish it.
    async fn terminate(mut self, reason: ExitReason) {
        let (_, replies) = self.queue.drain();
        for reply in replies.into_iter().flatten() {
            let _ = reply.send(Err(ProducerError::Closed));
        }

        if reason.is_abnormal() {
            tracing::error!(
                topic = %self.topic,
                broker = %self.broker,
                reason = ?reason,
                "producer terminated"
            );
            // Hold the slot so a supervisor cannot hammer a broker that just
            // rejected this producer.
            time::sleep(self.config.termination_timeout).await;
        } else {
            tracing::debug!(topic = %self.topic, "producer closed");
        }

        let _ = self.exit_tx.send(Some(reason));
    }
}
