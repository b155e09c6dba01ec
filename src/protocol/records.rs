//! Decoding of the record data delivered by fetch responses.
//!
//! A partition's data is a sequence of entries, each starting with
//! an offset and a size. Depending on the magic byte an entry is
//! either a legacy message (magic 0 and 1, possibly wrapping a
//! compressed message set) or a record batch (magic 2.)

use std::borrow::Cow;
use std::str;

use log::trace;

use crate::compression::{self, Compression};
use crate::error::{Error, Result};

use super::zreader::ZReader;
use super::{to_crc, to_crc32c};

// the position of the magic byte within an entry following the
// offset and size fields
const MAGIC_POS: usize = 4;

const TIMESTAMP_TYPE_FLAG: i16 = 0x08;
const CONTROL_FLAG: i16 = 0x20;

/// A header attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// A message fetched from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The offset at which this message resides in the partition.
    pub offset: i64,
    /// Milliseconds since the epoch; absent for the oldest message
    /// format.
    pub timestamp: Option<i64>,
    pub key: Option<Vec<u8>>,
    /// The value of the message; empty for a 'null' value.
    pub value: Vec<u8>,
    /// Empty for the legacy message formats.
    pub headers: Vec<Header>,
}

/// The decoded data of one partition of a fetch response.
#[derive(Debug, Default)]
pub struct RecordSet {
    pub messages: Vec<Message>,
    /// The offset following the last complete entry of the data;
    /// `None` if the data did not contain a single complete entry.
    pub next_offset: Option<i64>,
}

/// Decodes the given record data. A truncated trailing entry (which
/// brokers deliver when the data exceeds the requested max bytes) is
/// silently ignored.
pub fn decode(data: &[u8], validate_crc: bool) -> Result<RecordSet> {
    let mut set = RecordSet::default();
    let mut r = ZReader::new(data);
    while !r.is_empty() {
        let (offset, body) = match next_entry(&mut r) {
            Ok(entry) => entry,
            Err(Error::UnexpectedEOF) => {
                trace!("ignoring truncated entry ({} bytes)", r.rest().len());
                break;
            }
            Err(e) => return Err(e),
        };
        match body.get(MAGIC_POS).copied() {
            Some(2) => {
                let next = decode_batch(offset, body, validate_crc, &mut set.messages)?;
                set.next_offset = Some(next);
            }
            Some(0) | Some(1) => {
                decode_message(offset, body, validate_crc, &mut set.messages)?;
                set.next_offset = Some(offset + 1);
            }
            Some(_) => return Err(Error::CodecError),
            None => return Err(Error::UnexpectedEOF),
        }
    }
    Ok(set)
}

fn next_entry<'a>(r: &mut ZReader<'a>) -> Result<(i64, &'a [u8])> {
    let offset = r.read_i64()?;
    let size = r.read_i32()?;
    if size < 0 {
        return Err(Error::CodecError);
    }
    Ok((offset, r.read(size as usize)?))
}

/// Decodes a record batch appending its records to `out`. Returns the
/// offset following the batch.
fn decode_batch(
    base_offset: i64,
    body: &[u8],
    validate_crc: bool,
    out: &mut Vec<Message>,
) -> Result<i64> {
    let mut r = ZReader::new(body);
    let _leader_epoch = r.read_i32()?;
    let _magic = r.read_i8()?;
    let crc = r.read_u32()?;
    if validate_crc {
        let computed = to_crc32c(r.rest());
        if computed != crc {
            return Err(Error::InvalidChecksum {
                expected: crc,
                computed,
            });
        }
    }
    let attrs = r.read_i16()?;
    let last_offset_delta = r.read_i32()?;
    let first_timestamp = r.read_i64()?;
    let max_timestamp = r.read_i64()?;
    let _producer_id = r.read_i64()?;
    let _producer_epoch = r.read_i16()?;
    let _base_sequence = r.read_i32()?;
    let n_records = r.read_array_len()?;

    let next_offset = base_offset + i64::from(last_offset_delta) + 1;
    if attrs & CONTROL_FLAG != 0 {
        // transaction markers; not user data
        return Ok(next_offset);
    }

    let payload = match Compression::from_attributes(attrs)? {
        Compression::NONE => Cow::Borrowed(r.rest()),
        codec => Cow::Owned(compression::uncompress(codec, r.rest())?),
    };
    let log_append_time = attrs & TIMESTAMP_TYPE_FLAG != 0;

    let mut r = ZReader::new(&payload);
    // ~ every record occupies at least one byte; don't trust the
    // announced count any further
    out.reserve(n_records.min(r.rest().len()));
    for _ in 0..n_records {
        let len = r.read_varint()?;
        if len < 0 {
            return Err(Error::CodecError);
        }
        let mut rec = ZReader::new(r.read(len as usize)?);
        let _attrs = rec.read_i8()?;
        let timestamp_delta = rec.read_varlong()?;
        let offset_delta = rec.read_varint()?;
        let key = rec.read_varbytes()?.map(<[u8]>::to_vec);
        let value = rec.read_varbytes()?.unwrap_or_default().to_vec();
        let n_headers = rec.read_varint()?.max(0) as usize;
        let mut headers = Vec::with_capacity(n_headers.min(rec.rest().len()));
        for _ in 0..n_headers {
            let key = rec.read_varbytes()?.unwrap_or_default();
            let key = str::from_utf8(key).map_err(|_| Error::StringDecodeError)?;
            headers.push(Header {
                key: key.to_owned(),
                value: rec.read_varbytes()?.map(<[u8]>::to_vec),
            });
        }
        out.push(Message {
            offset: base_offset + i64::from(offset_delta),
            timestamp: Some(if log_append_time {
                max_timestamp
            } else {
                first_timestamp + timestamp_delta
            }),
            key,
            value,
            headers,
        });
    }
    Ok(next_offset)
}

/// Decodes a legacy message (magic 0 or 1) appending the resulting
/// messages to `out`. A compressed message wraps a whole message set.
fn decode_message(offset: i64, body: &[u8], validate_crc: bool, out: &mut Vec<Message>) -> Result<()> {
    let mut r = ZReader::new(body);
    let crc = r.read_u32()?;
    if validate_crc {
        let computed = to_crc(r.rest());
        if computed != crc {
            return Err(Error::InvalidChecksum {
                expected: crc,
                computed,
            });
        }
    }
    let magic = r.read_i8()?;
    let attrs = i16::from(r.read_i8()?);
    let timestamp = if magic >= 1 {
        Some(r.read_i64()?)
    } else {
        None
    };
    let key = r.read_nullable_bytes()?;
    let value = r.read_nullable_bytes()?.unwrap_or_default();

    let codec = Compression::from_attributes(attrs)?;
    if codec == Compression::NONE {
        out.push(Message {
            offset,
            timestamp,
            key: key.map(<[u8]>::to_vec),
            value: value.to_vec(),
            headers: Vec::new(),
        });
        return Ok(());
    }

    let inner = compression::uncompress(codec, value)?;
    let mut msgs = Vec::new();
    let mut r = ZReader::new(&inner);
    while !r.is_empty() {
        let (inner_offset, inner_body) = next_entry(&mut r)?;
        decode_message(inner_offset, inner_body, validate_crc, &mut msgs)?;
    }
    if magic >= 1 {
        // ~ inner offsets are relative; the wrapper carries the
        // absolute offset of the last inner message
        if let Some(last) = msgs.last().map(|m| m.offset) {
            let base = offset - last;
            for m in &mut msgs {
                m.offset += base;
            }
        }
        if attrs & TIMESTAMP_TYPE_FLAG != 0 {
            for m in &mut msgs {
                m.timestamp = timestamp;
            }
        }
    }
    out.append(&mut msgs);
    Ok(())
}
