use std::io::Read;

use lz4_flex::frame::FrameDecoder;

use crate::error::Result;

/// Uncompresses an LZ4 frame as found in record batches.
///
/// Note: message sets of magic 0 carry a frame header with a broken
/// header checksum and are rejected.
pub fn uncompress<T: Read>(src: T) -> Result<Vec<u8>> {
    let mut d = FrameDecoder::new(src);

    let mut buffer: Vec<u8> = Vec::new();
    d.read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
pub(crate) fn compress(data: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut e = lz4_flex::frame::FrameEncoder::new(Vec::new());
    e.write_all(data).unwrap();
    e.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::{compress, uncompress};
    use crate::error::Error;

    #[test]
    fn test_uncompress() {
        let compressed = compress(b"orders-100 orders-101 orders-102");
        let msg = uncompress(&compressed[..]).unwrap();
        assert_eq!(&b"orders-100 orders-101 orders-102"[..], &msg[..]);
    }

    #[test]
    fn test_uncompress_invalid() {
        let msg: Vec<u8> = vec![12, 42, 84, 104, 105, 115, 32, 105, 115, 32, 116, 101, 115, 116];
        assert!(matches!(uncompress(&msg[..]), Err(Error::Io(_))));
    }
}
