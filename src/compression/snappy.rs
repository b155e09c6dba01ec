use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

// ~ Uncompress 'src' appending the result to 'dst'.
fn uncompress_into(src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
    let len = snap::raw::decompress_len(src).map_err(|_| Error::InvalidSnappy)?;
    let start = dst.len();
    dst.resize(start + len, 0);
    match snap::raw::Decoder::new().decompress(src, &mut dst[start..]) {
        Ok(n) => {
            dst.truncate(start + n);
            Ok(())
        }
        Err(_) => {
            dst.truncate(start);
            Err(Error::InvalidSnappy)
        }
    }
}

// --------------------------------------------------------------------

const MAGIC: &[u8] = &[0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0];

// ~ reads a i32 value and "advances" the given slice by four bytes;
// assumes "slice" is a mutable reference to a &[u8].
macro_rules! next_i32 {
    ($slice:expr) => {{
        if $slice.len() < 4 {
            return Err(Error::UnexpectedEOF);
        }
        {
            let n = BigEndian::read_i32($slice);
            $slice = &$slice[4..];
            n
        }
    }};
}

/// Validates the expected header at the beginning of the
/// stream. Further, checks the version and compatibility of the
/// stream indicating we can parse the stream. Returns the rest of the
/// stream following the validated header.
fn validate_stream(mut stream: &[u8]) -> Result<&[u8]> {
    // ~ check the "header magic"
    if stream.len() < MAGIC.len() {
        return Err(Error::UnexpectedEOF);
    }
    if &stream[..MAGIC.len()] != MAGIC {
        return Err(Error::InvalidSnappy);
    }
    stream = &stream[MAGIC.len()..];
    // ~ let's be assertive and (for the moment) restrict ourselves to
    // version == 1 and compatibility == 1.
    let version = next_i32!(stream);
    if version != 1 {
        return Err(Error::InvalidSnappy);
    }
    let compat = next_i32!(stream);
    if compat != 1 {
        return Err(Error::InvalidSnappy);
    }
    Ok(stream)
}

/// Uncompresses a stream of snappy compressed chunks as produced by
/// org.xerial.snappy.SnappyOutputStream (the framing of the java
/// producer.) Data without that framing is treated as a single raw
/// snappy block.
pub fn uncompress(src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if !src.starts_with(MAGIC) {
        uncompress_into(src, &mut buf)?;
        return Ok(buf);
    }
    let mut chunks = validate_stream(src)?;
    while !chunks.is_empty() {
        let chunk_size = next_i32!(chunks);
        if chunk_size <= 0 {
            return Err(Error::InvalidSnappy);
        }
        let chunk_size = chunk_size as usize;
        if chunk_size > chunks.len() {
            return Err(Error::UnexpectedEOF);
        }
        let (c1, c2) = chunks.split_at(chunk_size);
        uncompress_into(c1, &mut buf)?;
        chunks = c2;
    }
    Ok(buf)
}

// --------------------------------------------------------------------
