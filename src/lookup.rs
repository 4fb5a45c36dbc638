//! Broker discovery through the admin HTTP lookup endpoint.

use crate::error::LookupError;
use crate::topic::Topic;
use http::Uri;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

const DEFAULT_BROKER_PORT: u16 = 6650;
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A broker endpoint (`host:port`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `pulsar://host:port` service url as returned by lookup.
    pub fn from_service_url(url: &str) -> Result<Self, LookupError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| LookupError::InvalidBrokerUrl(url.to_string()))?;
        let host = uri
            .host()
            .ok_or_else(|| LookupError::InvalidBrokerUrl(url.to_string()))?;
        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(DEFAULT_BROKER_PORT),
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Resolves the broker currently owning a topic partition.
///
/// Must be idempotent: the producer calls it once at start and then on every
/// ownership refresh.
pub trait LookupService: Send + Sync + 'static {
    fn lookup(
        &self,
        topic: &Topic,
    ) -> impl Future<Output = Result<BrokerAddress, LookupError>> + Send;
}

/// A fleet of per-partition producers shares one lookup service.
impl<S: LookupService> LookupService for std::sync::Arc<S> {
    async fn lookup(&self, topic: &Topic) -> Result<BrokerAddress, LookupError> {
        self.as_ref().lookup(topic).await
    }
}

/// Process-scope lookup configuration.
#[derive(Clone, Debug)]
pub struct LookupConfig {
    /// Bootstrap hosts the admin endpoint is reachable on.
    pub brokers: Vec<String>,
    /// HTTP admin port.
    pub admin_port: u16,
}

/// HTTP lookup against the Pulsar admin API.
///
/// Rotates through the bootstrap list so lookups spread across brokers, and
/// falls through to the next host on transport errors.
pub struct HttpLookup {
    config: LookupConfig,
    client: reqwest::Client,
    cursor: Mutex<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    broker_url: Option<String>,
    native_url: Option<String>,
}

impl HttpLookup {
    pub fn new(config: LookupConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()?;
        Ok(Self {
            config,
            client,
            cursor: Mutex::new(0),
        })
    }

    /// Bootstrap hosts in rotated order, advancing the cursor by one.
    fn rotation(&self) -> Vec<String> {
        let start = {
            let mut cursor = self.cursor.lock();
            let start = *cursor;
            *cursor = cursor.wrapping_add(1);
            start
        };
        let n = self.config.brokers.len();
        (0..n)
            .map(|i| self.config.brokers[(start + i) % n].clone())
            .collect()
    }

    async fn lookup_once(&self, host: &str, topic: &Topic) -> Result<BrokerAddress, LookupError> {
        let url = format!(
            "http://{}:{}/lookup/v2/topic/{}",
            host,
            self.config.admin_port,
            topic.lookup_path()
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(LookupError::Status { status, url });
        }

        let body = resp.bytes().await?;
        let decoded: LookupResponse = serde_json::from_slice(&body)?;
        let service_url = decoded
            .broker_url
            .filter(|url| !url.is_empty())
            .or(decoded.native_url)
            .ok_or(LookupError::MissingBrokerUrl)?;
        BrokerAddress::from_service_url(&service_url)
    }
}

impl LookupService for HttpLookup {
    async fn lookup(&self, topic: &Topic) -> Result<BrokerAddress, LookupError> {
        if self.config.brokers.is_empty() {
            return Err(LookupError::NoBrokers);
        }

        let mut last_transport_error = None;
        for host in self.rotation() {
            match self.lookup_once(&host, topic).await {
                Ok(broker) => return Ok(broker),
                Err(err @ (LookupError::Network(_) | LookupError::Timeout)) => {
                    tracing::debug!(topic = %topic, bootstrap = %host, error = %err, "lookup host unreachable");
                    last_transport_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_transport_error.unwrap_or(LookupError::NoBrokers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_parse() {
        let broker = BrokerAddress::from_service_url("pulsar://broker-1.cluster.local:6651").unwrap();
        assert_eq!(broker, BrokerAddress::new("broker-1.cluster.local", 6651));
        assert_eq!(broker.to_string(), "broker-1.cluster.local:6651");
    }

    #[test]
    fn test_service_url_default_port() {
        let broker = BrokerAddress::from_service_url("pulsar://broker-1").unwrap();
        assert_eq!(broker.port, 6650);
    }

    #[test]
    fn test_service_url_rejects_garbage() {
        assert!(BrokerAddress::from_service_url("").is_err());
        assert!(BrokerAddress::from_service_url("pulsar://").is_err());
    }

    #[test]
    fn test_lookup_response_decode() {
        let decoded: LookupResponse =
            serde_json::from_str(r#"{"brokerUrl":"pulsar://b1:6650","httpUrl":"http://b1:8080"}"#)
                .unwrap();
        assert_eq!(decoded.broker_url.as_deref(), Some("pulsar://b1:6650"));
        assert_eq!(decoded.native_url, None);
    }

    #[test]
    fn test_rotation_advances() {
        let lookup = HttpLookup::new(LookupConfig {
            brokers: vec!["a".into(), "b".into(), "c".into()],
            admin_port: 8080,
        })
        .unwrap();
        assert_eq!(lookup.rotation(), vec!["a", "b", "c"]);
        assert_eq!(lookup.rotation(), vec!["b", "c", "a"]);
    }
}
