use std::collections::hash_map::{Entry, HashMap};

use log::debug;

use crate::error::KafkaCode;
use crate::protocol;

/// The broker/leader cache of a `KafkaClient`.
#[derive(Debug, Default)]
pub struct ClientState {
    // ~ a list of known brokers referred to by the index in this
    // vector.  This index is also referred to as `BrokerRef` and is
    // enforced by this module.
    //
    // Note: loading of additional topic metadata must preserve
    // already present brokers in this vector at their position.
    // See `ClientState::update_metadata`
    brokers: Vec<Broker>,

    // ~ a mapping of topic to information about its partitions
    topic_partitions: HashMap<String, TopicPartitions>,
}

// --------------------------------------------------------------------

// ~ note: this type is re-exported to the crates public api through client::metadata
/// Describes a Kafka broker node of the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broker {
    /// The identifier of this broker as understood in a Kafka
    /// cluster.
    node_id: i32,
    /// "host:port" of this broker. This information is advertised by
    /// and originating from Kafka cluster itself.
    host: String,
}

impl Broker {
    pub(crate) fn new(node_id: i32, host: &str, port: i32) -> Broker {
        Broker {
            node_id,
            host: format!("{}:{}", host, port),
        }
    }

    /// Retrieves the node_id of this broker as identified with the
    /// remote Kafka cluster.
    #[inline]
    pub fn id(&self) -> i32 {
        self.node_id
    }

    /// Retrieves the host:port of the this Kafka broker.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// ~ A custom identifier for a broker.  This type hides the fact that
/// a `TopicPartition` references a `Broker` indirectly, loosely
/// through an index, thereby being able to share broker data without
/// having to fallback to `Rc` or `Arc` or otherwise fighting the
/// borrowck.
#[derive(Debug, Copy, Clone)]
struct BrokerRef {
    index: u32,
}

// --------------------------------------------------------------------

/// A representation of partitions for a single topic.
#[derive(Debug)]
struct TopicPartitions {
    // ~ partitions in the order reported by the cluster; including
    // partitions currently without a leader.
    partitions: Vec<TopicPartition>,
}

#[derive(Debug)]
struct TopicPartition {
    id: i32,
    leader: Option<BrokerRef>,
}

/// The outcome of looking up the leader of a partition in the cache.
#[derive(Debug, PartialEq, Eq)]
pub enum Leader<'a> {
    /// The topic or the partition is not (yet) known
    Unknown,
    /// The partition is known but currently has no leader
    NotAvailable,
    /// The "host:port" of the partition's leader
    Host(&'a str),
}

// --------------------------------------------------------------------

impl ClientState {
    pub fn new() -> Self {
        ClientState::default()
    }

    pub fn brokers(&self) -> &[Broker] {
        &self.brokers
    }

    /// The names of the known topics in ascending order.
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.topic_partitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn find_leader(&self, topic: &str, partition_id: i32) -> Leader<'_> {
        let partition = self
            .topic_partitions
            .get(topic)
            .and_then(|tp| tp.partitions.iter().find(|p| p.id == partition_id));
        match partition {
            None => Leader::Unknown,
            Some(p) => match p.leader.and_then(|b| self.brokers.get(b.index as usize)) {
                None => Leader::NotAvailable,
                Some(b) => Leader::Host(&b.host),
            },
        }
    }

    /// Loads new and updates existing metadata from the given
    /// metadata response. If `all_topics` is set, the response is
    /// considered to describe every topic of the cluster and topics
    /// missing from it are forgotten.
    pub fn update_metadata(&mut self, md: &protocol::MetadataResponse, all_topics: bool) {
        debug!("updating metadata from: {:?}", md);

        // ~ build an index of the already loaded brokers -- if any
        let mut brokers =
            HashMap::<i32, BrokerRef>::with_capacity(md.brokers.len() + self.brokers.len());
        for (i, broker) in (0u32..).zip(self.brokers.iter()) {
            brokers.insert(broker.node_id, BrokerRef { index: i });
        }

        // ~ now add new brokers or updated existing ones while
        // keeping the above 'broker' index up-to-date
        for broker in &md.brokers {
            let b = Broker::new(broker.node_id, &broker.host, broker.port);
            match brokers.entry(broker.node_id) {
                Entry::Occupied(e) => {
                    // ~ verify our information of the already tracked
                    // broker is up-to-date
                    let existing = &mut self.brokers[e.get().index as usize];
                    if existing.host != b.host {
                        existing.host = b.host;
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(BrokerRef {
                        index: self.brokers.len() as u32,
                    });
                    self.brokers.push(b);
                }
            }
        }

        if all_topics {
            self.topic_partitions.clear();
        }
        for t in &md.topics {
            if KafkaCode::from_protocol(t.error).is_some() {
                // ~ unknown or otherwise unusable topic
                self.topic_partitions.remove(&t.topic);
                continue;
            }
            let partitions = t
                .partitions
                .iter()
                .map(|p| {
                    let leader = brokers.get(&p.leader).copied();
                    if leader.is_none() {
                        debug!(
                            "unknown leader {} for topic-partition: {}:{}",
                            p.leader, t.topic, p.id
                        );
                    }
                    TopicPartition { id: p.id, leader }
                })
                .collect();
            self.topic_partitions
                .insert(t.topic.clone(), TopicPartitions { partitions });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::metadata::{BrokerMetadata, PartitionMetadata, TopicMetadata};
    use crate::protocol::MetadataResponse;

    fn broker(node_id: i32, port: i32) -> BrokerMetadata {
        BrokerMetadata {
            node_id,
            host: "localhost".to_owned(),
            port,
            rack: String::new(),
        }
    }

    fn topic(name: &str, error: i16, leaders: &[i32]) -> TopicMetadata {
        TopicMetadata {
            error,
            topic: name.to_owned(),
            is_internal: false,
            partitions: leaders
                .iter()
                .enumerate()
                .map(|(i, &leader)| PartitionMetadata {
                    error: 0,
                    id: i as i32,
                    leader,
                    replicas: vec![leader],
                    isr: vec![leader],
                })
                .collect(),
        }
    }

    fn response(brokers: Vec<BrokerMetadata>, topics: Vec<TopicMetadata>) -> MetadataResponse {
        MetadataResponse {
            brokers,
            topics,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_metadata_into_empty_state() {
        let mut s = ClientState::new();
        s.update_metadata(
            &response(
                vec![broker(1, 9092), broker(2, 9093)],
                vec![topic("b", 0, &[1, 2]), topic("a", 0, &[-1])],
            ),
            true,
        );
        assert_eq!(2, s.brokers().len());
        assert_eq!(vec!["a".to_owned(), "b".to_owned()], s.topic_names());
        assert_eq!(Leader::Host("localhost:9093"), s.find_leader("b", 1));
        assert_eq!(Leader::NotAvailable, s.find_leader("a", 0));
        assert_eq!(Leader::Unknown, s.find_leader("a", 1));
        assert_eq!(Leader::Unknown, s.find_leader("c", 0));
    }

    #[test]
    fn test_update_metadata_preserves_brokers() {
        let mut s = ClientState::new();
        s.update_metadata(&response(vec![broker(1, 9092)], vec![]), false);
        s.update_metadata(
            &response(vec![broker(2, 9093), broker(1, 9094)], vec![topic("t", 0, &[1])]),
            false,
        );
        assert_eq!(1, s.brokers()[0].id());
        assert_eq!("localhost:9094", s.brokers()[0].host());
        assert_eq!(2, s.brokers()[1].id());
        assert_eq!(Leader::Host("localhost:9094"), s.find_leader("t", 0));
    }

    #[test]
    fn test_update_metadata_drops_failed_and_missing_topics() {
        let mut s = ClientState::new();
        s.update_metadata(
            &response(vec![broker(1, 9092)], vec![topic("t", 0, &[1]), topic("u", 0, &[1])]),
            true,
        );
        s.update_metadata(&response(vec![], vec![topic("t", 3, &[])]), false);
        assert_eq!(vec!["u".to_owned()], s.topic_names());

        s.update_metadata(&response(vec![], vec![topic("v", 0, &[1])]), true);
        assert_eq!(vec!["v".to_owned()], s.topic_names());
    }
}
