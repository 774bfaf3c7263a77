//! A growable byte buffer with a read cursor, the workhorse underneath
//! every OSCAR wire structure in this crate.
//!
//! A `Buffer` is written to with the `add_*` methods (always appended at
//! the end) and read from with the `get_*` methods (always read from the
//! cursor, which then advances) — the two halves are never interleaved on
//! the same instance in this crate, mirroring how the wire types use it:
//! build one by appending, or wrap received bytes and drain it by reading.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A byte buffer with big/little-endian integer helpers and a read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: BytesMut,
    pos: usize,
}

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Buffer {
        Buffer::default()
    }

    /// Wraps existing bytes for reading.
    pub fn from_bytes(data: impl Into<BytesMut>) -> Buffer {
        Buffer { data: data.into(), pos: 0 }
    }

    /// Appends a single byte.
    pub fn add_byte(&mut self, byte: u8) -> &mut Self {
        self.data.put_u8(byte);
        self
    }

    /// Appends a big-endian 16-bit word.
    pub fn add_word(&mut self, word: u16) -> &mut Self {
        self.data.put_u16(word);
        self
    }

    /// Appends a big-endian 32-bit double-word.
    pub fn add_dword(&mut self, dword: u32) -> &mut Self {
        self.data.put_u32(dword);
        self
    }

    /// Appends a little-endian 16-bit word.
    pub fn add_le_word(&mut self, word: u16) -> &mut Self {
        self.data.put_u16_le(word);
        self
    }

    /// Appends a little-endian 32-bit double-word.
    pub fn add_le_dword(&mut self, dword: u32) -> &mut Self {
        self.data.put_u32_le(dword);
        self
    }

    /// Appends raw bytes.
    pub fn add_data(&mut self, data: &[u8]) -> &mut Self {
        self.data.put_slice(data);
        self
    }

    /// True if the read cursor has reached the end.
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left to read from the cursor to the end.
    pub fn bytes_available(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// The whole buffer's contents, irrespective of the read cursor.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total buffer size.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Current read cursor position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves the read cursor to an absolute position, clamped to the end.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Moves the read cursor to the end.
    pub fn seek_end(&mut self) {
        self.pos = self.data.len();
    }

    /// Advances the read cursor by `count`, clamped to the end.
    pub fn seek_forward(&mut self, count: usize) {
        self.seek(self.pos + count);
    }

    /// Moves the read cursor back by `count`, clamped to the start.
    pub fn seek_backward(&mut self, count: usize) {
        self.pos = self.pos.saturating_sub(count);
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.bytes_available() < n {
            return Err(Error::UnexpectedEnd { requested: n, available: self.bytes_available() });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Reads a single byte, advancing the cursor.
    pub fn get_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads `len` bytes, advancing the cursor.
    pub fn get_block(&mut self, len: usize) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    /// Alias for [`Buffer::get_block`], matching this crate's read/write
    /// naming pairs.
    pub fn read(&mut self, max_size: usize) -> Result<Bytes> {
        self.get_block(max_size)
    }

    /// Reads every remaining byte, advancing the cursor to the end.
    pub fn read_all(&mut self) -> Bytes {
        let rest = self.bytes_available();
        self.get_block(rest).expect("rest is always available")
    }

    /// Reads a big-endian 16-bit word, advancing the cursor.
    pub fn get_word(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16())
    }

    /// Reads a big-endian 32-bit double-word, advancing the cursor.
    pub fn get_dword(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32())
    }

    /// Reads a little-endian 16-bit word, advancing the cursor.
    pub fn get_le_word(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    /// Reads a little-endian 32-bit double-word, advancing the cursor.
    pub fn get_le_dword(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    /// Replaces the buffer's contents and resets the read cursor.
    pub fn set_data(&mut self, data: impl Into<BytesMut>) {
        self.data = data.into();
        self.pos = 0;
    }

    /// Consumes the buffer, returning its contents.
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Buffer {
        Buffer::from_bytes(BytesMut::from(&data[..]))
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Buffer {
        Buffer::from_bytes(BytesMut::from(data))
    }
}

impl From<Bytes> for Buffer {
    fn from(data: Bytes) -> Buffer {
        Buffer::from_bytes(BytesMut::from(&data[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrip() {
        let mut buf = Buffer::new();
        buf.add_byte(0x2A).add_word(0x1234).add_dword(0xdead_beef).add_data(b"hi");
        assert_eq!(buf.size(), 1 + 2 + 4 + 2);

        let mut reader = Buffer::from(buf.data());
        assert_eq!(reader.get_byte().unwrap(), 0x2A);
        assert_eq!(reader.get_word().unwrap(), 0x1234);
        assert_eq!(reader.get_dword().unwrap(), 0xdead_beef);
        assert_eq!(&reader.read_all()[..], b"hi");
        assert!(reader.at_end());
    }

    #[test]
    fn little_endian_helpers() {
        let mut buf = Buffer::new();
        buf.add_le_word(0x1234).add_le_dword(0x0102_0304);
        let mut reader = Buffer::from(buf.data());
        assert_eq!(reader.get_le_word().unwrap(), 0x1234);
        assert_eq!(reader.get_le_dword().unwrap(), 0x0102_0304);
    }

    #[test]
    fn short_read_is_an_error() {
        let mut buf = Buffer::from(&b"a"[..]);
        assert_eq!(
            buf.get_word(),
            Err(Error::UnexpectedEnd { requested: 2, available: 1 })
        );
    }

    #[test]
    fn seeking() {
        let mut buf = Buffer::from(&b"abcdef"[..]);
        buf.seek_forward(2);
        assert_eq!(buf.get_byte().unwrap(), b'c');
        buf.seek_backward(2);
        assert_eq!(buf.get_byte().unwrap(), b'b');
        buf.seek_end();
        assert!(buf.at_end());
    }
}
