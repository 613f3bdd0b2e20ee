//! Wire primitives for the canonical block encoding.
//!
//! Everything the node writes to the network or to disk goes through the
//! [`ByteWriter`] / [`ByteReader`] pair defined here:
//!
//! - fixed-width integers are **little-endian**,
//! - byte slices are prefixed with a 32-bit signed length, where a length
//!   of `0` marks an absent optional field,
//! - strings are UTF-8 prefixed with a 7-bit-encoded varint byte length
//!   (`0xxxxxxx` terminates, each `1xxxxxxx` contributes seven low bits,
//!   little-endian).
//!
//! The string framing must stay bit-for-bit compatible with headers already
//! on the wire; do not change it.

use crate::error::BlockError;

/// Append-only writer producing the canonical byte stream.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer and returns the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends raw bytes with no framing.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a UTF-8 string with the 7-bit-varint byte-length prefix.
    pub fn write_string(&mut self, s: &str) {
        let mut len = s.len() as u32;
        loop {
            let byte = (len & 0x7f) as u8;
            len >>= 7;
            if len != 0 {
                self.buf.push(byte | 0x80);
            } else {
                self.buf.push(byte);
                break;
            }
        }
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Writes a byte slice with a 32-bit signed length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an optional byte slice; `None` is encoded as length `0`.
    pub fn write_opt_bytes(&mut self, bytes: Option<&[u8]>) {
        match bytes {
            Some(b) => self.write_bytes(b),
            None => self.write_i32(0),
        }
    }
}

/// Bounds-checked reader over a canonical byte stream.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BlockError> {
        if self.remaining() < n {
            return Err(BlockError::Decode(format!(
                "unexpected end of buffer: wanted {n} bytes, {} remain",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, BlockError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32, BlockError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    pub fn read_u32(&mut self) -> Result<u32, BlockError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    pub fn read_i64(&mut self) -> Result<i64, BlockError> {
        let bytes = self.take(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    pub fn read_u64(&mut self) -> Result<u64, BlockError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    /// Reads the 7-bit-varint byte-length prefix of a string.
    fn read_varint_len(&mut self) -> Result<usize, BlockError> {
        let mut len: u32 = 0;
        let mut shift: u32 = 0;
        loop {
            if shift >= 35 {
                return Err(BlockError::Decode(
                    "string length varint is longer than 5 bytes".to_string(),
                ));
            }
            let byte = self.read_u8()?;
            len |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(len as usize)
    }

    /// Reads a UTF-8 string framed by [`ByteWriter::write_string`].
    pub fn read_string(&mut self) -> Result<String, BlockError> {
        let len = self.read_varint_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| BlockError::Decode(format!("invalid UTF-8 in string: {e}")))
    }

    /// Reads a byte slice with a 32-bit signed length prefix.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, BlockError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(BlockError::Decode(format!("negative length prefix {len}")));
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    /// Reads an optional byte slice; a length of `0` yields `None`.
    pub fn read_opt_bytes(&mut self) -> Result<Option<Vec<u8>>, BlockError> {
        let bytes = self.read_bytes()?;
        if bytes.is_empty() { Ok(None) } else { Ok(Some(bytes)) }
    }

    /// Reads a signed element count, rejecting negative values.
    pub fn read_count(&mut self, what: &str) -> Result<usize, BlockError> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(BlockError::Decode(format!("negative {what} count {count}")));
        }
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut w = ByteWriter::new();
        w.write_i32(0x0102_0304);
        w.write_u64(0x0506_0708_090A_0B0C);
        let bytes = w.into_bytes();

        assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..], &[0x0C, 0x0B, 0x0A, 0x09, 0x08, 0x07, 0x06, 0x05]);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i32().expect("i32"), 0x0102_0304);
        assert_eq!(r.read_u64().expect("u64"), 0x0506_0708_090A_0B0C);
        assert!(r.is_empty());
    }

    #[test]
    fn string_prefix_is_single_byte_below_128() {
        let mut w = ByteWriter::new();
        w.write_string("A");
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0x01, b'A']);
    }

    #[test]
    fn string_prefix_uses_continuation_bit_at_128() {
        // 300 = 0b10_0101100: low seven bits 0x2C with the continuation
        // bit set, then 0x02.
        let s = "x".repeat(300);
        let mut w = ByteWriter::new();
        w.write_string(&s);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 0xAC);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(bytes.len(), 302);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_string().expect("string"), s);
    }

    #[test]
    fn string_roundtrip_at_varint_boundaries() {
        for len in [0usize, 1, 127, 128, 255, 16_383, 16_384] {
            let s = "y".repeat(len);
            let mut w = ByteWriter::new();
            w.write_string(&s);
            let bytes = w.into_bytes();
            let mut r = ByteReader::new(&bytes);
            assert_eq!(r.read_string().expect("string"), s, "len {len}");
            assert!(r.is_empty());
        }
    }

    #[test]
    fn overlong_varint_is_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_string().is_err());
    }

    #[test]
    fn zero_length_prefix_means_absent() {
        let mut w = ByteWriter::new();
        w.write_opt_bytes(None);
        w.write_opt_bytes(Some(&[1, 2, 3]));
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_opt_bytes().expect("absent"), None);
        assert_eq!(r.read_opt_bytes().expect("present"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn negative_length_prefix_is_rejected() {
        let mut w = ByteWriter::new();
        w.write_i32(-5);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_bytes().is_err());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut w = ByteWriter::new();
        w.write_bytes(&[9; 16]);
        let mut bytes = w.into_bytes();
        bytes.truncate(10);
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_bytes().is_err());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        // Length 2, then an invalid UTF-8 sequence.
        let bytes = [0x02, 0xC3, 0x28];
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_string().is_err());
    }
}
