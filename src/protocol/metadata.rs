use std::io::{Read, Write};

use crate::codecs::{AsStrings, FromByte, ToByte};
use crate::error::Result;

use super::{HeaderRequest, HeaderResponse};
use super::{API_KEY_METADATA, API_VERSION_METADATA};

/// https://kafka.apache.org/protocol.html#The_Messages_Metadata (v1)
///
/// `topics: None` asks for all topics of the cluster, an empty slice
/// for no topics at all (i.e. only the brokers.)
#[derive(Debug)]
pub struct MetadataRequest<'a, T: 'a> {
    pub header: HeaderRequest<'a>,
    pub topics: Option<&'a [T]>,
}

impl<'a, T: AsRef<str>> MetadataRequest<'a, T> {
    pub fn new(
        correlation_id: i32,
        client_id: &'a str,
        topics: Option<&'a [T]>,
    ) -> MetadataRequest<'a, T> {
        MetadataRequest {
            header: HeaderRequest::new(
                API_KEY_METADATA,
                API_VERSION_METADATA,
                correlation_id,
                client_id,
            ),
            topics,
        }
    }
}

impl<'a, T: AsRef<str> + 'a> ToByte for MetadataRequest<'a, T> {
    fn encode<W: Write>(&self, buffer: &mut W) -> Result<()> {
        try_multi!(
            self.header.encode(buffer),
            AsStrings(self.topics).encode(buffer)
        )
    }
}

// --------------------------------------------------------------------

#[derive(Default, Debug)]
pub struct MetadataResponse {
    pub header: HeaderResponse,
    pub brokers: Vec<BrokerMetadata>,
    pub controller_id: i32,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Default, Debug)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: String,
}

#[derive(Default, Debug)]
pub struct TopicMetadata {
    pub error: i16,
    pub topic: String,
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Default, Debug)]
pub struct PartitionMetadata {
    pub error: i16,
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

impl FromByte for MetadataResponse {
    type R = MetadataResponse;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.header.decode(buffer),
            self.brokers.decode(buffer),
            self.controller_id.decode(buffer),
            self.topics.decode(buffer)
        )
    }
}

impl FromByte for BrokerMetadata {
    type R = BrokerMetadata;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.node_id.decode(buffer),
            self.host.decode(buffer),
            self.port.decode(buffer),
            self.rack.decode(buffer)
        )
    }
}

impl FromByte for TopicMetadata {
    type R = TopicMetadata;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.error.decode(buffer),
            self.topic.decode(buffer),
            self.is_internal.decode(buffer),
            self.partitions.decode(buffer)
        )
    }
}

impl FromByte for PartitionMetadata {
    type R = PartitionMetadata;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.error.decode(buffer),
            self.id.decode(buffer),
            self.leader.decode(buffer),
            self.replicas.decode(buffer),
            self.isr.decode(buffer)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{MetadataRequest, MetadataResponse};
    use crate::codecs::{FromByte, ToByte};

    #[test]
    fn test_encode_all_topics_request() {
        let mut buf = Vec::new();
        MetadataRequest::<&str>::new(1, "x", None)
            .encode(&mut buf)
            .unwrap();
        assert_eq!(
            buf,
            [0, 3, 0, 1, 0, 0, 0, 1, 0, 1, b'x', 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_decode_response() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            0, 0, 0, 9,                     // correlation id
            0, 0, 0, 1,                     // one broker
            0, 0, 0, 2,                     //   node id
            0, 4, b'k', b'a', b'f', b'k',   //   host
            0, 0, 0x23, 0x84,               //   port 9092
            0xff, 0xff,                     //   null rack
            0, 0, 0, 2,                     // controller id
            0, 0, 0, 1,                     // one topic
            0, 0,                           //   no error
            0, 1, b't',                     //   name
            0,                              //   not internal
            0, 0, 0, 1,                     //   one partition
            0, 0,                           //     no error
            0, 0, 0, 0,                     //     id
            0, 0, 0, 2,                     //     leader
            0, 0, 0, 1, 0, 0, 0, 2,         //     replicas
            0, 0, 0, 1, 0, 0, 0, 2,         //     isr
        ];
        let resp = MetadataResponse::decode_new(&mut Cursor::new(data)).unwrap();
        assert_eq!(9, resp.header.correlation);
        assert_eq!(1, resp.brokers.len());
        assert_eq!("kafk", resp.brokers[0].host);
        assert_eq!(9092, resp.brokers[0].port);
        assert_eq!("", resp.brokers[0].rack);
        assert_eq!(2, resp.controller_id);
        assert_eq!(1, resp.topics.len());
        assert_eq!("t", resp.topics[0].topic);
        assert!(!resp.topics[0].is_internal);
        assert_eq!(vec![2], resp.topics[0].partitions[0].replicas);
        assert_eq!(2, resp.topics[0].partitions[0].leader);
    }
}
