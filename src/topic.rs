//! Topic identity.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const PERSISTENT_PREFIX: &str = "persistent://";
const PARTITION_MARKER: &str = "-partition-";

/// A single partition of a (possibly partitioned) Pulsar topic.
///
/// Equality is structural. The canonical string form
/// `persistent://tenant/namespace/name[-partition-N]` is what shows up in
/// logs and in lookup requests.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    pub tenant: String,
    pub namespace: String,
    pub name: String,
    /// Partition index; `None` for a non-partitioned topic.
    pub partition: Option<u32>,
}

/// Error for a topic string that does not follow the canonical form.
#[derive(Debug, Clone, Error)]
#[error("invalid topic name: {0}")]
pub struct InvalidTopic(String);

impl Topic {
    /// A non-partitioned topic.
    pub fn new(
        tenant: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            namespace: namespace.into(),
            name: name.into(),
            partition: None,
        }
    }

    /// One partition of a partitioned topic.
    pub fn partitioned(
        tenant: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        partition: u32,
    ) -> Self {
        Self {
            partition: Some(partition),
            ..Self::new(tenant, namespace, name)
        }
    }

    /// Parse the canonical form, with or without the `persistent://` prefix.
    ///
    /// A trailing `-partition-N` suffix is recognised as the partition index.
    pub fn parse(s: &str) -> Result<Self, InvalidTopic> {
        let rest = s.strip_prefix(PERSISTENT_PREFIX).unwrap_or(s);

        let mut parts = rest.splitn(3, '/');
        let (tenant, namespace, local) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(n), Some(l)) if !t.is_empty() && !n.is_empty() && !l.is_empty() => {
                (t, n, l)
            }
            _ => return Err(InvalidTopic(s.to_string())),
        };
        if local.contains('/') {
            return Err(InvalidTopic(s.to_string()));
        }

        let (name, partition) = match local.rsplit_once(PARTITION_MARKER) {
            Some((name, index)) if !name.is_empty() => match index.parse::<u32>() {
                Ok(partition) => (name, Some(partition)),
                // Not an index; the topic just happens to contain the marker.
                Err(_) => (local, None),
            },
            _ => (local, None),
        };

        Ok(Self {
            tenant: tenant.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            partition,
        })
    }

    /// Fully qualified name, partition suffix included.
    pub fn full_name(&self) -> String {
        format!(
            "{PERSISTENT_PREFIX}{}/{}/{}",
            self.tenant,
            self.namespace,
            self.local_name()
        )
    }

    /// Path segment used by the admin lookup endpoint.
    pub(crate) fn lookup_path(&self) -> String {
        format!(
            "persistent/{}/{}/{}",
            self.tenant,
            self.namespace,
            self.local_name()
        )
    }

    fn local_name(&self) -> String {
        match self.partition {
            Some(index) => format!("{}{PARTITION_MARKER}{index}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl FromStr for Topic {
    type Err = InvalidTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let topic = Topic::parse("persistent://tenant/ns/events").unwrap();
        assert_eq!(topic, Topic::new("tenant", "ns", "events"));
        assert_eq!(topic.to_string(), "persistent://tenant/ns/events");
    }

    #[test]
    fn test_parse_partition_suffix() {
        let topic = Topic::parse("persistent://tenant/ns/events-partition-3").unwrap();
        assert_eq!(topic, Topic::partitioned("tenant", "ns", "events", 3));
        assert_eq!(topic.to_string(), "persistent://tenant/ns/events-partition-3");
    }

    #[test]
    fn test_parse_without_prefix() {
        let topic = Topic::parse("tenant/ns/events").unwrap();
        assert_eq!(topic, Topic::new("tenant", "ns", "events"));
    }

    #[test]
    fn test_parse_non_numeric_partition_marker() {
        let topic = Topic::parse("tenant/ns/logs-partition-old").unwrap();
        assert_eq!(topic.name, "logs-partition-old");
        assert_eq!(topic.partition, None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Topic::parse("tenant/ns").is_err());
        assert!(Topic::parse("persistent://tenant//events").is_err());
        assert!(Topic::parse("tenant/ns/a/b").is_err());
    }

    #[test]
    fn test_lookup_path() {
        let topic = Topic::partitioned("tenant", "ns", "events", 0);
        assert_eq!(topic.lookup_path(), "persistent/tenant/ns/events-partition-0");
    }
}
