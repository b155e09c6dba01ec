//! Request and response structures of the Kafka wire protocol as far
//! as they are needed by this crate.

use std::io::{Read, Write};
use std::time::Duration;

use crc::Crc;

use crate::codecs::{FromByte, ToByte};
use crate::error::{Error, Result};

/// Macro to return Result<()> from multiple statements
macro_rules! try_multi {
    ($($input_expr:expr),*) => ({
        $($input_expr?;)*
        Ok(())
    })
}

// ~ helper macro to aid parsing arrays of values (as defined by the
// Kafka protocol.)
macro_rules! array_of {
    ($zreader:ident, $parse_elem:expr) => {{
        let n_elems = $zreader.read_array_len()?;
        let mut array = Vec::with_capacity(n_elems);
        for _ in 0..n_elems {
            array.push($parse_elem?);
        }
        array
    }};
}

pub mod fetch;
pub mod groups;
pub mod list_offset;
pub mod metadata;
pub mod records;
pub mod zreader;

// ~ convenient re-exports for request/response types defined in the
// submodules
pub use self::fetch::FetchRequest;
pub use self::groups::{ListGroupsRequest, ListGroupsResponse};
pub use self::list_offset::{ListOffsetVersion, ListOffsetsRequest, ListOffsetsResponse};
pub use self::metadata::{MetadataRequest, MetadataResponse};

// --------------------------------------------------------------------

pub(crate) const API_KEY_FETCH: i16 = 1;
pub(crate) const API_KEY_OFFSET: i16 = 2;
pub(crate) const API_KEY_METADATA: i16 = 3;
pub(crate) const API_KEY_LIST_GROUPS: i16 = 16;

// the versions of the Kafka APIs we are requesting
pub(crate) const API_VERSION_FETCH: i16 = 4;
pub(crate) const API_VERSION_METADATA: i16 = 1;
pub(crate) const API_VERSION_LIST_GROUPS: i16 = 0;

// --------------------------------------------------------------------

/// Provides a way to parse the full raw response data into a
/// particular response structure.
pub trait ResponseParser {
    type T;
    fn parse(&self, response: Vec<u8>) -> Result<Self::T>;
}

// --------------------------------------------------------------------

#[derive(Debug)]
pub struct HeaderRequest<'a> {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: &'a str,
}

impl<'a> HeaderRequest<'a> {
    fn new(
        api_key: i16,
        api_version: i16,
        correlation_id: i32,
        client_id: &'a str,
    ) -> HeaderRequest<'a> {
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id,
        }
    }
}

impl<'a> ToByte for HeaderRequest<'a> {
    fn encode<W: Write>(&self, buffer: &mut W) -> Result<()> {
        try_multi!(
            self.api_key.encode(buffer),
            self.api_version.encode(buffer),
            self.correlation_id.encode(buffer),
            self.client_id.encode(buffer)
        )
    }
}

// --------------------------------------------------------------------

#[derive(Default, Debug, Clone)]
pub struct HeaderResponse {
    pub correlation: i32,
}

impl FromByte for HeaderResponse {
    type R = HeaderResponse;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        self.correlation.decode(buffer)
    }
}

// --------------------------------------------------------------------

/// Checksum of legacy (magic 0 and 1) messages.
pub fn to_crc(data: &[u8]) -> u32 {
    Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(data)
}

/// Checksum of record batches (magic 2).
pub fn to_crc32c(data: &[u8]) -> u32 {
    Crc::<u32>::new(&crc::CRC_32_ISCSI).checksum(data)
}

// --------------------------------------------------------------------

/// Safely converts a Duration into the number of milliseconds as a
/// i32 as often required in the kafka protocol.
pub fn to_millis_i32(d: Duration) -> Result<i32> {
    let m = d
        .as_secs()
        .saturating_mul(1_000)
        .saturating_add(u64::from(d.subsec_millis()));
    if m > i32::MAX as u64 {
        Err(Error::InvalidDuration)
    } else {
        Ok(m as i32)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_to_millis_i32() {
        fn assert_invalid(d: Duration) {
            match to_millis_i32(d) {
                Err(Error::InvalidDuration) => {}
                other => panic!("Expected Err(InvalidDuration) but got {:?}", other),
            }
        }
        fn assert_valid(d: Duration, expected_millis: i32) {
            let r = to_millis_i32(d);
            match r {
                Ok(m) => assert_eq!(expected_millis, m),
                Err(e) => panic!("Expected Ok({}) but got Err({:?})", expected_millis, e),
            }
        }
        assert_valid(Duration::from_millis(1_234), 1_234);
        assert_valid(Duration::new(540, 123_456_789), 540_123);
        assert_invalid(Duration::from_millis(u64::MAX));
        assert_invalid(Duration::from_millis(i32::MAX as u64 + 1));
        assert_valid(Duration::from_millis(i32::MAX as u64 - 1), i32::MAX - 1);
    }

    #[test]
    fn test_header_request_encoding() {
        let mut buf = Vec::new();
        HeaderRequest::new(API_KEY_METADATA, 1, 7, "ab")
            .encode(&mut buf)
            .unwrap();
        assert_eq!(buf, [0, 3, 0, 1, 0, 0, 0, 7, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_checksums() {
        // the well known check values of both algorithms
        assert_eq!(0xcbf4_3926, to_crc(b"123456789"));
        assert_eq!(0xe306_9283, to_crc32c(b"123456789"));
    }
}
