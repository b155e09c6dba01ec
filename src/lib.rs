//! An inspection client for a [Kafka](http://kafka.apache.org/)
//! cluster.
//!
//! `client::KafkaClient` discovers the brokers of a cluster and
//! answers the questions an operator typically asks: which topics
//! exist, how are they partitioned and led, which offsets does a
//! partition currently hold, what do the messages at a given offset
//! look like, and which consumer groups are known.
//!
//! Reads are bounded: `KafkaClient::fetch` delivers at most a given
//! number of messages and returns what it has once its timeout
//! expires.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use kafka_inspect::KafkaClient;
//!
//! let client = KafkaClient::connect(&["localhost:9092"]).unwrap();
//! for topic in client.topic_metadata::<&str>(&[]).unwrap() {
//!     for p in topic.partitions() {
//!         let range = client.offset_range(topic.name(), p.id()).unwrap();
//!         println!("{}:{} => {:?}", topic.name(), p.id(), range);
//!     }
//! }
//! let msgs = client.fetch("my-topic", 0, 0, 10, Duration::from_secs(5)).unwrap();
//! println!("read {} messages", msgs.len());
//! ```

pub mod client;
mod codecs;
mod compression;
pub mod error;
mod protocol;

pub use self::client::{
    Broker, Builder, FetchOffset, GroupDescription, Header, KafkaClient, Message, OffsetRange,
    PartitionMetadata, TopicMetadata,
};
pub use self::error::{
    ConnectionError, Error, FetchError, GroupError, KafkaCode, MetadataError, OffsetError, Result,
};
