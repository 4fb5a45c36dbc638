//! Broker binding: resolve the owning broker and register the producer over
//! a pooled connection.

use crate::connection::{Connection, ConnectionManager, ProducerCreated, ProducerOptions};
use crate::error::ProducerError;
use crate::lookup::{BrokerAddress, LookupService};
use crate::topic::Topic;
use rand::Rng;
use std::time::Duration;

/// A live topic-to-broker binding.
pub(crate) struct Binding<C> {
    pub(crate) broker: BrokerAddress,
    pub(crate) connection: C,
    pub(crate) created: ProducerCreated,
}

/// Look the topic up, check a connection out of the per-broker pool and
/// register the producer on it. The pool is only touched here; the binding
/// keeps the checked-out connection handle.
pub(crate) async fn establish<L, M>(
    lookup: &L,
    manager: &M,
    topic: &Topic,
    opts: &ProducerOptions,
) -> Result<Binding<M::Conn>, ProducerError>
where
    L: LookupService,
    M: ConnectionManager,
{
    let broker = lookup
        .lookup(topic)
        .await
        .map_err(|err| ProducerError::LookupFailed(err.to_string()))?;
    let connection = manager
        .checkout(&broker)
        .await
        .map_err(|err| ProducerError::CreateProducerFailed(err.to_string()))?;
    let created = connection
        .create_producer(&topic.full_name(), opts)
        .await
        .map_err(|err| ProducerError::CreateProducerFailed(err.to_string()))?;

    tracing::info!(
        topic = %topic,
        broker = %broker,
        producer_id = created.producer_id,
        producer_name = %created.producer_name,
        "producer registered"
    );

    Ok(Binding {
        broker,
        connection,
        created,
    })
}

/// Delay until the next ownership re-verification.
///
/// Jitter is mandatory: a fleet of per-partition actors refreshing on the
/// same period would otherwise hit the admin endpoint in lockstep.
pub(crate) fn refresh_delay(refresh_interval: Duration) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..refresh_interval.as_millis().max(1) as u64);
    refresh_interval + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_delay_within_bounds() {
        let interval = Duration::from_secs(10);
        for _ in 0..200 {
            let delay = refresh_delay(interval);
            assert!(delay >= interval);
            assert!(delay < interval * 2);
        }
    }
}
