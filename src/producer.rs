//! Public producer surface: the builder and the clone-able handle.

use crate::actor::{Command, ProducerActor, ProducerConfig};
use crate::binder;
use crate::connection::{ConnectionManager, ProducerCreated, ProducerOptions};
use crate::error::{ExitReason, ProducerError};
use crate::lookup::LookupService;
use crate::message::{MessageId, MessageOptions};
use crate::topic::Topic;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

// Floors and caps on the producer knobs. Out-of-range values are clamped
// silently.
const MIN_BATCH_SIZE: usize = 1;
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
const MAX_TERMINATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for a partitioned producer.
#[must_use = "builders do nothing unless you call .create()"]
pub struct ProducerBuilder<L, M> {
    topic: Topic,
    lookup: L,
    manager: M,
    batch_enabled: bool,
    batch_size: usize,
    flush_interval: Duration,
    refresh_interval: Duration,
    termination_timeout: Duration,
    broker_options: ProducerOptions,
}

impl<L, M> ProducerBuilder<L, M>
where
    L: LookupService,
    M: ConnectionManager,
{
    pub fn new(topic: Topic, lookup: L, manager: M) -> Self {
        Self {
            topic,
            lookup,
            manager,
            batch_enabled: false,
            batch_size: 100,
            flush_interval: Duration::from_millis(100),
            refresh_interval: Duration::from_secs(60),
            termination_timeout: Duration::from_secs(3),
            broker_options: ProducerOptions::default(),
        }
    }

    /// Coalesce publishes into server-side batches. Off by default.
    pub fn batching(mut self, enabled: bool) -> Self {
        self.batch_enabled = enabled;
        self
    }

    /// Entries that trigger a size-based dispatch. Floor 1, default 100.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Latency bound for partially filled batches. Floor 100 ms.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Period of broker ownership re-verification, jittered per tick.
    /// Floor 10 s, default 60 s.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Hold-down after an abnormal exit, keeping a supervisor from
    /// recreating the producer in a tight loop. Capped at 5 s, default 3 s.
    pub fn termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = timeout;
        self
    }

    /// Options forwarded verbatim to the broker on producer registration.
    pub fn broker_options(mut self, opts: ProducerOptions) -> Self {
        self.broker_options = opts;
        self
    }

    /// Resolve the owning broker, register the producer and spawn its actor.
    pub async fn create(self) -> Result<Producer, ProducerError> {
        let config = ProducerConfig {
            batch_enabled: self.batch_enabled,
            batch_size: self.batch_size.max(MIN_BATCH_SIZE),
            flush_interval: self.flush_interval.max(MIN_FLUSH_INTERVAL),
            refresh_interval: self.refresh_interval.max(MIN_REFRESH_INTERVAL),
            termination_timeout: self.termination_timeout.min(MAX_TERMINATION_TIMEOUT),
        };

        let binding =
            binder::establish(&self.lookup, &self.manager, &self.topic, &self.broker_options)
                .await?;
        // The pool is only needed for the checkout above; the actor keeps
        // the connection handle it was given.
        drop(self.manager);

        let info = Arc::new(binding.created.clone());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        let actor = ProducerActor::new(
            self.topic.clone(),
            config,
            binding,
            self.lookup,
            commands_rx,
            exit_tx,
        );
        tokio::spawn(actor.run());

        Ok(Producer {
            topic: self.topic,
            info,
            commands: commands_tx,
            exit: exit_rx,
        })
    }
}

/// Handle to a running partitioned producer.
///
/// Cheap to clone; every clone feeds the same single-threaded actor, so
/// per-partition ordering holds across clones. Dropping the last clone
/// closes the producer.
#[derive(Clone)]
pub struct Producer {
    topic: Topic,
    info: Arc<ProducerCreated>,
    commands: mpsc::UnboundedSender<Command>,
    exit: watch::Receiver<Option<ExitReason>>,
}

impl Producer {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The broker's registration reply: assigned name, access mode,
    /// advertised max message size.
    pub fn info(&self) -> &ProducerCreated {
        &self.info
    }

    /// Publish and wait for the broker receipt.
    ///
    /// In batch mode the caller waits until its batch is drained; the
    /// receipt it gets acknowledges that whole batch.
    pub async fn produce(
        &self,
        payload: impl Into<Bytes>,
        opts: MessageOptions,
    ) -> Result<MessageId, ProducerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Publish {
                payload: payload.into(),
                opts,
                reply: Some(tx),
            })
            .map_err(|_| ProducerError::Closed)?;
        rx.await.map_err(|_| ProducerError::Closed)?
    }

    /// Fire-and-forget publish. Never blocks; delivery errors are dropped.
    pub fn produce_async(
        &self,
        payload: impl Into<Bytes>,
        opts: MessageOptions,
    ) -> Result<(), ProducerError> {
        self.commands
            .send(Command::Publish {
                payload: payload.into(),
                opts,
                reply: None,
            })
            .map_err(|_| ProducerError::Closed)
    }

    /// Ask the actor to terminate and wait until it has. Queued entries are
    /// failed with [`ProducerError::Closed`].
    pub async fn close(&self) -> ExitReason {
        let _ = self.commands.send(Command::Close);
        self.terminated().await
    }

    /// Wait for the actor to exit; resolves to its terminal reason.
    ///
    /// After an abnormal exit this resolves only once the termination
    /// hold-down has elapsed, so a supervisor awaiting it cannot recreate
    /// the producer in a tight loop.
    pub async fn terminated(&self) -> ExitReason {
        let mut exit = self.exit.clone();
        let result = match exit.wait_for(|reason| reason.is_some()).await {
            Ok(reason) => reason.clone().unwrap_or(ExitReason::Closed),
            // The actor never dropped its sender without publishing; treat a
            // torn-down runtime as a close.
            Err(_) => ExitReason::Closed,
        };
        result
    }
}
