//! TLV (type-length-value) — the basic unit OSCAR packs almost everything
//! into: login parameters, SSI items, ICBM message blocks.

use crate::buffer::Buffer;
use crate::error::Result;
use bytes::Bytes;

/// A single type-length-value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    ty: u16,
    payload: Bytes,
}

impl Tlv {
    /// Creates a TLV of the given type with no payload.
    pub fn new(ty: u16) -> Tlv {
        Tlv { ty, payload: Bytes::new() }
    }

    /// Creates a TLV carrying `data`.
    pub fn with_data(ty: u16, data: impl Into<Bytes>) -> Tlv {
        Tlv { ty, payload: data.into() }
    }

    /// Creates a TLV carrying a big-endian `u8` value.
    pub fn with_byte(ty: u16, value: u8) -> Tlv {
        Tlv::with_data(ty, vec![value])
    }

    /// Creates a TLV carrying a big-endian `u16` value.
    pub fn with_word(ty: u16, value: u16) -> Tlv {
        let mut b = Buffer::new();
        b.add_word(value);
        Tlv::with_data(ty, b.into_bytes())
    }

    /// Creates a TLV carrying a big-endian `u32` value.
    pub fn with_dword(ty: u16, value: u32) -> Tlv {
        let mut b = Buffer::new();
        b.add_dword(value);
        Tlv::with_data(ty, b.into_bytes())
    }

    /// Creates a TLV carrying a UTF-8 string, unescaped.
    pub fn with_str(ty: u16, value: &str) -> Tlv {
        Tlv::with_data(ty, Bytes::copy_from_slice(value.as_bytes()))
    }

    /// The TLV's type.
    pub fn ty(&self) -> u16 {
        self.ty
    }

    /// Sets the TLV's type.
    pub fn set_ty(&mut self, ty: u16) {
        self.ty = ty;
    }

    /// The TLV's payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload interpreted as a big-endian `u16`, if long enough.
    pub fn as_word(&self) -> Option<u16> {
        let mut b = Buffer::from(self.payload.clone());
        b.get_word().ok()
    }

    /// The payload interpreted as a big-endian `u32`, if long enough.
    pub fn as_dword(&self) -> Option<u32> {
        let mut b = Buffer::from(self.payload.clone());
        b.get_dword().ok()
    }

    /// The payload interpreted as a UTF-8 string (lossily).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Serialises this TLV to `type (2) | length (2) | payload`.
    pub fn to_bytes(&self) -> Bytes {
        let mut b = Buffer::new();
        b.add_word(self.ty);
        b.add_word(self.payload.len() as u16);
        b.add_data(&self.payload);
        b.into_bytes()
    }

    /// Reads one TLV off the front of `buffer`, advancing its cursor.
    pub fn read_from(buffer: &mut Buffer) -> Result<Tlv> {
        let ty = buffer.get_word()?;
        let len = buffer.get_word()? as usize;
        let payload = buffer.get_block(len)?;
        Ok(Tlv { ty, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_bytes() {
        let tlv = Tlv::with_str(0x0001, "icquser");
        let bytes = tlv.to_bytes();
        let mut buf = Buffer::from(bytes);
        let parsed = Tlv::read_from(&mut buf).unwrap();
        assert_eq!(parsed.ty(), 0x0001);
        assert_eq!(parsed.as_str(), "icquser");
    }

    #[test]
    fn numeric_accessors() {
        let tlv = Tlv::with_dword(0x0006, 0xF000_0000);
        assert_eq!(tlv.as_dword(), Some(0xF000_0000));
    }
}
