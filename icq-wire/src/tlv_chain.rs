//! An insertion-ordered collection of [`Tlv`]s, as used to pack login
//! parameters, SSI item attributes, and ICBM message TLV blocks.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::tlv::Tlv;
use bytes::Bytes;

/// An ordered chain of TLVs, keyed by type. Adding a TLV whose type is
/// already present replaces it in place, preserving the position of the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvChain {
    tlvs: Vec<Tlv>,
}

impl TlvChain {
    /// Creates an empty chain.
    pub fn new() -> TlvChain {
        TlvChain::default()
    }

    /// Parses a chain out of consecutive TLVs filling the whole buffer.
    pub fn parse(mut buffer: Buffer) -> Result<TlvChain> {
        let mut chain = TlvChain::new();
        while buffer.bytes_available() > 0 {
            chain.add_tlv(Tlv::read_from(&mut buffer)?);
        }
        Ok(chain)
    }

    /// Parses a chain from raw bytes (shorthand for `parse(Buffer::from(data))`).
    pub fn from_bytes(data: impl Into<Buffer>) -> Result<TlvChain> {
        TlvChain::parse(data.into())
    }

    /// Adds (or replaces) a TLV in the chain.
    pub fn add_tlv(&mut self, tlv: Tlv) -> &mut Self {
        if let Some(slot) = self.tlvs.iter_mut().find(|t| t.ty() == tlv.ty()) {
            *slot = tlv;
        } else {
            self.tlvs.push(tlv);
        }
        self
    }

    /// Adds a raw type/payload pair to the chain.
    pub fn add(&mut self, ty: u16, data: impl Into<Bytes>) -> &mut Self {
        self.add_tlv(Tlv::with_data(ty, data))
    }

    /// Serialises the whole chain in insertion order.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Buffer::new();
        for tlv in &self.tlvs {
            buf.add_data(&tlv.to_bytes());
        }
        buf.into_bytes()
    }

    /// Returns the first TLV of the given type, if present.
    pub fn get(&self, ty: u16) -> Option<&Tlv> {
        self.tlvs.iter().find(|t| t.ty() == ty)
    }

    /// Returns the payload of the first TLV of the given type, if present.
    pub fn get_data(&self, ty: u16) -> Option<&[u8]> {
        self.get(ty).map(Tlv::payload)
    }

    /// True if a TLV of the given type is present.
    pub fn has(&self, ty: u16) -> bool {
        self.tlvs.iter().any(|t| t.ty() == ty)
    }

    /// Removes a TLV of the given type, if present.
    pub fn remove(&mut self, ty: u16) {
        self.tlvs.retain(|t| t.ty() != ty);
    }

    /// Iterates over the chain's TLVs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tlv> {
        self.tlvs.iter()
    }

    /// Appends every TLV of `other` onto this chain, in its insertion order.
    pub fn extend_from(&mut self, other: &TlvChain) -> &mut Self {
        for tlv in other.iter() {
            self.add_tlv(tlv.clone());
        }
        self
    }
}

impl<'a> IntoIterator for &'a TlvChain {
    type Item = &'a Tlv;
    type IntoIter = std::slice::Iter<'a, Tlv>;

    fn into_iter(self) -> Self::IntoIter {
        self.tlvs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_overwrites_in_place() {
        let mut chain = TlvChain::new();
        chain.add(0x01, &b"first"[..]);
        chain.add(0x02, &b"second"[..]);
        chain.add(0x01, &b"replaced"[..]);
        let order: Vec<u16> = chain.iter().map(Tlv::ty).collect();
        assert_eq!(order, vec![0x01, 0x02]);
        assert_eq!(chain.get_data(0x01), Some(&b"replaced"[..]));
    }

    #[test]
    fn parse_roundtrip() {
        let mut chain = TlvChain::new();
        chain.add(0x01, &b"a"[..]);
        chain.add(0x06, &b"bb"[..]);
        let bytes = chain.to_bytes();
        let parsed = TlvChain::from_bytes(bytes.to_vec()).unwrap();
        assert_eq!(parsed.get_data(0x06), Some(&b"bb"[..]));
        assert!(parsed.has(0x01));
        assert!(!parsed.has(0x99));
    }
}
