//! Decompression of fetched message data.

use crate::error::{Error, Result};

#[cfg(feature = "gzip")]
pub mod gzip;

#[cfg(feature = "lz4")]
pub mod lz4;

#[cfg(feature = "snappy")]
pub mod snappy;

#[cfg(feature = "zstandard")]
pub mod zstandard;

/// Compression types known to kafka. The numeral values of this
/// enumeration correspond to the compression encoding in the
/// attributes of a message or a record batch in the protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    NONE = 0,
    GZIP = 1,
    SNAPPY = 2,
    LZ4 = 3,
    ZSTD = 4,
}

impl Compression {
    /// Extracts the compression codec from the attributes of a
    /// message (legacy formats) or a record batch. The codec is
    /// denoted by the lowest three bits.
    pub fn from_attributes(attrs: i16) -> Result<Compression> {
        match attrs & 0x07 {
            0 => Ok(Compression::NONE),
            1 => Ok(Compression::GZIP),
            2 => Ok(Compression::SNAPPY),
            3 => Ok(Compression::LZ4),
            4 => Ok(Compression::ZSTD),
            _ => Err(Error::UnsupportedCompression),
        }
    }
}

/// Uncompresses the given payload encoded with `codec`. Fails with
/// `Error::UnsupportedCompression` for codecs this build cannot
/// handle.
pub fn uncompress(codec: Compression, data: &[u8]) -> Result<Vec<u8>> {
    match codec {
        Compression::NONE => Ok(data.to_vec()),
        #[cfg(feature = "gzip")]
        Compression::GZIP => gzip::uncompress(data),
        #[cfg(feature = "snappy")]
        Compression::SNAPPY => snappy::uncompress(data),
        #[cfg(feature = "lz4")]
        Compression::LZ4 => lz4::uncompress(data),
        #[cfg(feature = "zstandard")]
        Compression::ZSTD => zstandard::uncompress(data),
        #[allow(unreachable_patterns)]
        _ => Err(Error::UnsupportedCompression),
    }
}
