//! Types related to topic metadata for introspection by clients.
//! Example: `KafkaClient::topic_metadata()`.

use crate::error::KafkaCode;
use crate::protocol;

// public re-export
pub use super::state::Broker;

// the maximum length of a topic name accepted by kafka
const MAX_TOPIC_NAME_LEN: usize = 249;

/// Metadata of a single topic as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    name: String,
    internal: bool,
    error: Option<KafkaCode>,
    partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    /// Retrieves the name of this topic.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is an internal topic of the cluster, e.g.
    /// `__consumer_offsets`.
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// The error reported by the cluster for this topic, if any.
    /// A topic unknown to the cluster is reported with
    /// `KafkaCode::UnknownTopicOrPartition` and no partitions.
    #[inline]
    pub fn error(&self) -> Option<KafkaCode> {
        self.error
    }

    /// The partitions of this topic in the order reported by the
    /// cluster.
    #[inline]
    pub fn partitions(&self) -> &[PartitionMetadata] {
        &self.partitions
    }
}

/// Metadata of a single topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    id: i32,
    leader: i32,
    replicas: Vec<i32>,
    isr: Vec<i32>,
    error: Option<KafkaCode>,
}

impl PartitionMetadata {
    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// The node id of the broker currently leading this partition;
    /// `None` if the partition is without a leader.
    #[inline]
    pub fn leader(&self) -> Option<i32> {
        if self.leader < 0 {
            None
        } else {
            Some(self.leader)
        }
    }

    #[inline]
    pub fn replicas(&self) -> &[i32] {
        &self.replicas
    }

    /// The in-sync replicas.
    #[inline]
    pub fn isr(&self) -> &[i32] {
        &self.isr
    }

    #[inline]
    pub fn error(&self) -> Option<KafkaCode> {
        self.error
    }
}

impl<'a> From<&'a protocol::metadata::TopicMetadata> for TopicMetadata {
    fn from(t: &'a protocol::metadata::TopicMetadata) -> Self {
        TopicMetadata {
            name: t.topic.clone(),
            internal: t.is_internal,
            error: KafkaCode::from_protocol(t.error),
            partitions: t.partitions.iter().map(PartitionMetadata::from).collect(),
        }
    }
}

impl<'a> From<&'a protocol::metadata::PartitionMetadata> for PartitionMetadata {
    fn from(p: &'a protocol::metadata::PartitionMetadata) -> Self {
        PartitionMetadata {
            id: p.id,
            leader: p.leader,
            replicas: p.replicas.clone(),
            isr: p.isr.clone(),
            error: KafkaCode::from_protocol(p.error),
        }
    }
}

/// Determines whether `name` is a legal kafka topic name: non-empty,
/// at most 249 characters of `[a-zA-Z0-9._-]`, and neither `.` nor
/// `..`.
pub fn is_valid_topic_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOPIC_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}
