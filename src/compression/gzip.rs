use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::Result;

pub fn uncompress<T: Read>(src: T) -> Result<Vec<u8>> {
    let mut d = GzDecoder::new(src);

    let mut buffer: Vec<u8> = Vec::new();
    match d.read_to_end(&mut buffer) {
        Err(err) => Err(From::from(err)),
        Ok(_) => Ok(buffer),
    }
}
