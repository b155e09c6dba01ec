//! Error types of this crate.
//!
//! `Error` describes failures on the wire level (i/o, protocol
//! decoding, error codes reported by a broker.)  Each public operation
//! of `KafkaClient` reports its own error type which wraps `Error`
//! where a broker or the network is the cause.

use std::{io, result};

use num_enum::TryFromPrimitive;
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An error as reported by a remote Kafka server
    #[error("Kafka Error ({0:?})")]
    Kafka(KafkaCode),

    /// An error reported by the remote Kafka server for a particular
    /// topic and partition.
    #[error("Topic Partition Error ({topic_name:?}, {partition_id:?}, {error_code:?})")]
    TopicPartitionError {
        topic_name: String,
        partition_id: i32,
        error_code: KafkaCode,
    },

    /// Failure to correctly parse the server response by this library
    /// due to an unsupported compression format of the data
    #[error("Unsupported compression format")]
    UnsupportedCompression,

    /// Failure to decode a snappy compressed payload
    #[error("Invalid snappy input")]
    InvalidSnappy,

    /// Failure to decode a response due to an insufficient number of bytes available
    #[error("Unexpected EOF")]
    UnexpectedEOF,

    /// Failure to decode or encode a response or request respectively
    #[error("Encoding/Decoding Error")]
    CodecError,

    /// Failure to decode a string into a valid utf8 byte sequence
    #[error("String decoding error")]
    StringDecodeError,

    /// A fetched message or record batch did not match its checksum
    #[error("Checksum mismatch (expected: {expected:#010x}, computed: {computed:#010x})")]
    InvalidChecksum { expected: u32, computed: u32 },

    /// An invalid user-provided duration
    #[error("Invalid duration")]
    InvalidDuration,

    /// Unable to reach any host
    #[error("No host reachable")]
    NoHostReachable,

    /// The client has been closed and must not be used any longer
    #[error("Client closed")]
    ClientClosed,
}

impl Error {
    /// Maps a non-zero protocol error code into an error.
    pub(crate) fn from_protocol(n: i16) -> Option<Error> {
        KafkaCode::from_protocol(n).map(Error::Kafka)
    }

    /// Determines whether this error was reported by the broker with
    /// the given code.
    pub fn is_kafka_code(&self, code: KafkaCode) -> bool {
        match *self {
            Error::Kafka(c) => c == code,
            Error::TopicPartitionError { error_code, .. } => error_code == code,
            _ => false,
        }
    }
}

/// Failures establishing a `KafkaClient`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No bootstrap address was given
    #[error("At least one bootstrap address must be provided")]
    NoBootstrapAddress,

    /// None of the bootstrap addresses answered a metadata request
    #[error("No bootstrap address reachable (tried: {hosts:?})")]
    Unreachable {
        hosts: Vec<String>,
        #[source]
        source: Error,
    },
}

/// Failures resolving topic metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No broker has been discovered to send the request to
    #[error("No broker is available")]
    NoBrokerAvailable,

    /// The given topic name is not a legal kafka topic name
    #[error("Invalid topic name: {0:?}")]
    InvalidTopicName(String),

    #[error(transparent)]
    Broker(#[from] Error),
}

/// Failures resolving the offset range of a partition.
#[derive(Debug, Error)]
pub enum OffsetError {
    /// The topic or the partition is not known to the cluster
    #[error("Partition not found: {topic}:{partition}")]
    PartitionNotFound { topic: String, partition: i32 },

    /// The partition exists but has no leader at the moment
    #[error("No leader available for: {topic}:{partition}")]
    LeaderNotAvailable { topic: String, partition: i32 },

    #[error(transparent)]
    Broker(#[from] Error),
}

/// Failures opening a read cursor on a partition.
///
/// Note that a fetch running into its deadline is not an error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The topic or the partition is not known to the cluster
    #[error("Invalid partition: {topic}:{partition}")]
    InvalidPartition { topic: String, partition: i32 },

    /// The partition exists but has no leader at the moment
    #[error("No leader available for: {topic}:{partition}")]
    LeaderNotAvailable { topic: String, partition: i32 },

    /// The requested start offset lies outside `[low, high]` of the
    /// partition at the time the cursor was opened
    #[error("Offset {offset} out of range [{low}, {high}]")]
    OffsetOutOfRange { offset: i64, low: i64, high: i64 },

    #[error(transparent)]
    Broker(#[from] Error),
}

/// Failures listing consumer groups.
#[derive(Debug, Error)]
pub enum GroupError {
    /// No broker has been discovered to send the request to
    #[error("No broker is available")]
    BrokerUnavailable,

    #[error(transparent)]
    Broker(#[from] Error),
}

impl From<OffsetError> for FetchError {
    fn from(e: OffsetError) -> Self {
        match e {
            OffsetError::PartitionNotFound { topic, partition } => {
                FetchError::InvalidPartition { topic, partition }
            }
            OffsetError::LeaderNotAvailable { topic, partition } => {
                FetchError::LeaderNotAvailable { topic, partition }
            }
            OffsetError::Broker(e) => FetchError::Broker(e),
        }
    }
}

/// Various errors reported by a remote Kafka server.
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html)
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(i16)]
pub enum KafkaCode {
    /// An unexpected server error
    Unknown = -1,
    /// The requested offset is outside the range of offsets
    /// maintained by the server for the given topic/partition
    OffsetOutOfRange = 1,
    /// This indicates that a message contents does not match its CRC
    CorruptMessage = 2,
    /// This request is for a topic or partition that does not exist
    /// on this broker.
    UnknownTopicOrPartition = 3,
    /// The message has a negative size
    InvalidMessageSize = 4,
    /// This error is thrown if we are in the middle of a leadership
    /// election and there is currently no leader for this partition
    /// and hence it is unavailable for writes.
    LeaderNotAvailable = 5,
    /// This error is thrown if the client attempts to send messages
    /// to a replica that is not the leader for some partition. It
    /// indicates that the clients metadata is out of date.
    NotLeaderForPartition = 6,
    /// This error is thrown if the request exceeds the user-specified
    /// time limit in the request.
    RequestTimedOut = 7,
    /// This is not a client facing error and is used mostly by tools
    /// when a broker is not alive.
    BrokerNotAvailable = 8,
    /// If replica is expected on a broker, but is not (this can be
    /// safely ignored).
    ReplicaNotAvailable = 9,
    /// The server has a configurable maximum message size to avoid
    /// unbounded memory allocation. This error is thrown if the
    /// client attempt to produce a message larger than this maximum.
    MessageSizeTooLarge = 10,
    /// Internal error code for broker-to-broker communication.
    StaleControllerEpoch = 11,
    /// If you specify a string larger than configured maximum for
    /// offset metadata
    OffsetMetadataTooLarge = 12,
    /// The server disconnected before a response was received.
    NetworkException = 13,
    /// The broker returns this error code for group membership
    /// requests when group metadata is being loaded by the
    /// coordinator.
    GroupLoadInProgress = 14,
    /// The broker returns this error code for group coordinator
    /// requests if the offsets topic has not yet been created, or if
    /// the group coordinator is not active.
    GroupCoordinatorNotAvailable = 15,
    /// The broker returns this error code if it receives a group
    /// request for a group that it is not a coordinator for.
    NotCoordinatorForGroup = 16,
    /// For a request which attempts to access an invalid topic
    /// (e.g. one which has an illegal name.)
    InvalidTopic = 17,
    /// If a message batch in a produce request exceeds the maximum
    /// configured segment size.
    RecordListTooLarge = 18,
    /// Returned from a produce request when the number of in-sync
    /// replicas is lower than the configured minimum.
    NotEnoughReplicas = 19,
    /// Returned from a produce request when the message was written
    /// to the log, but with fewer in-sync replicas than required.
    NotEnoughReplicasAfterAppend = 20,
    /// Returned from a produce request if the requested requiredAcks is
    /// invalid.
    InvalidRequiredAcks = 21,
    /// Returned from group membership requests when the generation id
    /// provided in the request is not the current generation.
    IllegalGeneration = 22,
    /// Returned in join group when the member provides a protocol type or
    /// set of protocols which is not compatible with the current group.
    InconsistentGroupProtocol = 23,
    /// Returned in join group when the groupId is empty or null.
    InvalidGroupId = 24,
    /// Returned from group requests when the memberId is not in the
    /// current generation.
    UnknownMemberId = 25,
    /// Return in join group when the requested session timeout is outside
    /// of the allowed range on the broker
    InvalidSessionTimeout = 26,
    /// Returned in heartbeat requests when the coordinator has begun
    /// rebalancing the group.
    RebalanceInProgress = 27,
    /// This error indicates that an offset commit was rejected because of
    /// oversize metadata.
    InvalidCommitOffsetSize = 28,
    /// Returned by the broker when the client is not authorized to access
    /// the requested topic.
    TopicAuthorizationFailed = 29,
    /// Returned by the broker when the client is not authorized to access
    /// a particular groupId.
    GroupAuthorizationFailed = 30,
    /// Returned by the broker when the client is not authorized to use an
    /// inter-broker or administrative API.
    ClusterAuthorizationFailed = 31,
    /// The timestamp of the message is out of acceptable range.
    InvalidTimestamp = 32,
    /// The broker does not support the requested SASL mechanism.
    UnsupportedSaslMechanism = 33,
    /// Request is not valid given the current SASL state.
    IllegalSaslState = 34,
    /// The version of API is not supported.
    UnsupportedVersion = 35,
}

impl KafkaCode {
    /// Maps a protocol error code to a `KafkaCode`.  Zero denotes "no
    /// error"; codes this library does not know are reported as
    /// `KafkaCode::Unknown`.
    pub fn from_protocol(n: i16) -> Option<KafkaCode> {
        if n == 0 {
            return None;
        }
        Some(KafkaCode::try_from(n).unwrap_or(KafkaCode::Unknown))
    }
}
