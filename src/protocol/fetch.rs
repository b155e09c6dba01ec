//! The "fetch messages" request and an eager response parser
//! decoding the delivered records into owned messages.

use std::io::Write;

use crate::codecs::ToByte;
use crate::error::{KafkaCode, Result};

use super::records::{self, RecordSet};
use super::zreader::ZReader;
use super::{HeaderRequest, API_KEY_FETCH, API_VERSION_FETCH};

// read_uncommitted
const ISOLATION_LEVEL: i8 = 0;

/// https://kafka.apache.org/protocol.html#The_Messages_Fetch (v4)
#[derive(Debug)]
pub struct FetchRequest<'a, 'b> {
    pub header: HeaderRequest<'a>,
    pub replica: i32,
    pub max_wait_time: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub topic_partitions: Vec<TopicPartitionFetchRequest<'b>>,
}

#[derive(Debug)]
pub struct TopicPartitionFetchRequest<'a> {
    pub topic: &'a str,
    pub partitions: Vec<PartitionFetchRequest>,
}

#[derive(Debug)]
pub struct PartitionFetchRequest {
    pub partition: i32,
    pub offset: i64,
    pub max_bytes: i32,
}

impl<'a, 'b> FetchRequest<'a, 'b> {
    pub fn new(
        correlation_id: i32,
        client_id: &'a str,
        max_wait_time: i32,
        min_bytes: i32,
    ) -> FetchRequest<'a, 'b> {
        FetchRequest {
            header: HeaderRequest::new(API_KEY_FETCH, API_VERSION_FETCH, correlation_id, client_id),
            replica: -1,
            max_wait_time,
            min_bytes,
            max_bytes: i32::MAX,
            isolation_level: ISOLATION_LEVEL,
            topic_partitions: vec![],
        }
    }

    pub fn add(&mut self, topic: &'b str, partition: i32, offset: i64, max_bytes: i32) {
        for tp in &mut self.topic_partitions {
            if tp.topic == topic {
                tp.add(partition, offset, max_bytes);
                return;
            }
        }
        let mut tp = TopicPartitionFetchRequest::new(topic);
        tp.add(partition, offset, max_bytes);
        self.topic_partitions.push(tp);
    }
}

impl<'a> TopicPartitionFetchRequest<'a> {
    pub fn new(topic: &'a str) -> TopicPartitionFetchRequest<'a> {
        TopicPartitionFetchRequest {
            topic,
            partitions: vec![],
        }
    }

    pub fn add(&mut self, partition: i32, offset: i64, max_bytes: i32) {
        self.partitions.push(PartitionFetchRequest {
            partition,
            offset,
            max_bytes,
        })
    }
}

impl<'a, 'b> ToByte for FetchRequest<'a, 'b> {
    fn encode<W: Write>(&self, buffer: &mut W) -> Result<()> {
        try_multi!(
            self.header.encode(buffer),
            self.replica.encode(buffer),
            self.max_wait_time.encode(buffer),
            self.min_bytes.encode(buffer),
            self.max_bytes.encode(buffer),
            self.isolation_level.encode(buffer),
            self.topic_partitions.encode(buffer)
        )
    }
}

impl<'a> ToByte for TopicPartitionFetchRequest<'a> {
    fn encode<W: Write>(&self, buffer: &mut W) -> Result<()> {
        try_multi!(self.topic.encode(buffer), self.partitions.encode(buffer))
    }
}

impl ToByte for PartitionFetchRequest {
    fn encode<T: Write>(&self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.partition.encode(buffer),
            self.offset.encode(buffer),
            self.max_bytes.encode(buffer)
        )
    }
}

// --------------------------------------------------------------------

/// Parses fetch responses; optionally validating the checksums of the
/// delivered records.
pub struct FetchResponseParser {
    pub validate_crc: bool,
}

impl super::ResponseParser for FetchResponseParser {
    type T = FetchResponse;

    fn parse(&self, response: Vec<u8>) -> Result<Self::T> {
        FetchResponse::from_vec(&response, self.validate_crc)
    }
}

/// The result of a "fetch messages" request from a particular Kafka
/// broker.
#[derive(Debug)]
pub struct FetchResponse {
    pub topics: Vec<TopicFetchResponse>,
}

#[derive(Debug)]
pub struct TopicFetchResponse {
    pub topic: String,
    pub partitions: Vec<PartitionFetchResponse>,
}

/// The fetched data of a single partition.
///
/// Note: there might have been an error for a particular partition
/// (but not for another), in which case `error` is set and `records`
/// is empty.
#[derive(Debug)]
pub struct PartitionFetchResponse {
    pub partition: i32,
    pub error: Option<KafkaCode>,
    pub high_watermark: i64,
    pub records: RecordSet,
    /// Whether the broker delivered any record data at all.
    pub has_data: bool,
}

impl FetchResponse {
    /// Parses a FetchResponse from binary data as defined by the
    /// Kafka Protocol.
    pub fn from_vec(response: &[u8], validate_crc: bool) -> Result<FetchResponse> {
        let mut r = ZReader::new(response);
        let _correlation_id = r.read_i32()?;
        let _throttle_time_ms = r.read_i32()?;
        let topics = array_of!(r, TopicFetchResponse::read(&mut r, validate_crc));
        Ok(FetchResponse { topics })
    }

    /// Removes and returns the data of the given topic partition.
    pub fn take_partition(&mut self, topic: &str, partition: i32) -> Option<PartitionFetchResponse> {
        let t = self.topics.iter_mut().find(|t| t.topic == topic)?;
        let i = t.partitions.iter().position(|p| p.partition == partition)?;
        Some(t.partitions.swap_remove(i))
    }
}

impl TopicFetchResponse {
    fn read(r: &mut ZReader<'_>, validate_crc: bool) -> Result<TopicFetchResponse> {
        let topic = r.read_str()?.to_owned();
        let partitions = array_of!(r, PartitionFetchResponse::read(r, validate_crc));
        Ok(TopicFetchResponse { topic, partitions })
    }
}

impl PartitionFetchResponse {
    fn read(r: &mut ZReader<'_>, validate_crc: bool) -> Result<PartitionFetchResponse> {
        let partition = r.read_i32()?;
        let error = KafkaCode::from_protocol(r.read_i16()?);
        // we need to parse the rest even if there was an error to
        // consume the input stream (zreader)
        let high_watermark = r.read_i64()?;
        let _last_stable_offset = r.read_i64()?;
        // ~ aborted transactions; only relevant for read_committed
        let n_aborted = r.read_array_len()?;
        r.read(n_aborted * 16)?;
        let data = r.read_bytes()?;
        let records = match error {
            Some(_) => RecordSet::default(),
            None => records::decode(data, validate_crc)?,
        };
        Ok(PartitionFetchResponse {
            partition,
            error,
            high_watermark,
            records,
            has_data: !data.is_empty(),
        })
    }
}
