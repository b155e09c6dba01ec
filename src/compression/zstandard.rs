use std::io;

use crate::error::Result;

pub fn uncompress<R: io::Read>(source: R) -> Result<Vec<u8>> {
    zstd::decode_all(source).map_err(From::from)
}
