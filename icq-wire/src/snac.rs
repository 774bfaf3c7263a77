//! SNAC — the command header carried on the FLAP data channel: a family,
//! subtype, flags, and a client-chosen request id echoed back in replies.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::flap::{Channel, FlapBuffer};
use bytes::Bytes;

/// Size of a SNAC header: family, subtype, flags, request id.
pub const SNAC_HEADER_SIZE: usize = 10;

/// One SNAC command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnacBuffer {
    family: u16,
    subtype: u16,
    flags: u16,
    request_id: u32,
    payload: Bytes,
}

impl SnacBuffer {
    /// Creates an empty SNAC for the given family/subtype.
    pub fn new(family: u16, subtype: u16) -> SnacBuffer {
        SnacBuffer { family, subtype, flags: 0, request_id: 0, payload: Bytes::new() }
    }

    /// Creates a SNAC carrying `data`.
    pub fn with_data(family: u16, subtype: u16, data: impl Into<Bytes>) -> SnacBuffer {
        SnacBuffer { family, subtype, flags: 0, request_id: 0, payload: data.into() }
    }

    /// The command family.
    pub fn family(&self) -> u16 {
        self.family
    }

    /// The command subtype.
    pub fn subtype(&self) -> u16 {
        self.subtype
    }

    /// SNAC-level flags (the "more fragments follow" / "contains a request
    /// id extension" bits).
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Sets the SNAC-level flags.
    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    /// The request id, echoed back by the server on the matching reply.
    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    /// Sets the request id.
    pub fn set_request_id(&mut self, request_id: u32) {
        self.request_id = request_id;
    }

    /// The SNAC's payload, not including the SNAC or FLAP headers.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size, not including either header.
    pub fn data_size(&self) -> usize {
        self.payload.len()
    }

    /// Serialises the SNAC header and payload (no FLAP header).
    pub fn to_bytes(&self) -> Bytes {
        let mut b = Buffer::new();
        b.add_word(self.family);
        b.add_word(self.subtype);
        b.add_word(self.flags);
        b.add_dword(self.request_id);
        b.add_data(&self.payload);
        b.into_bytes()
    }

    /// Wraps this SNAC in a FLAP frame on the data channel.
    pub fn to_flap(&self) -> FlapBuffer {
        FlapBuffer::with_data(Channel::Data as u8, self.to_bytes())
    }

    /// Extracts a SNAC from a FLAP frame's payload.
    pub fn from_flap(flap: &FlapBuffer) -> Result<SnacBuffer> {
        if flap.channel() != Channel::Data as u8 {
            return Err(Error::NotASnacChannel(flap.channel()));
        }
        let mut buf = Buffer::from(flap.payload());
        let family = buf.get_word()?;
        let subtype = buf.get_word()?;
        let flags = buf.get_word()?;
        let request_id = buf.get_dword()?;
        let payload = buf.read_all();
        Ok(SnacBuffer { family, subtype, flags, request_id, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_flap() {
        let mut snac = SnacBuffer::with_data(0x0002, 0x0006, &b"payload"[..]);
        snac.set_request_id(42);
        let flap = snac.to_flap();
        let decoded = SnacBuffer::from_flap(&flap).unwrap();
        assert_eq!(decoded.family(), 0x0002);
        assert_eq!(decoded.subtype(), 0x0006);
        assert_eq!(decoded.request_id(), 42);
        assert_eq!(decoded.payload(), b"payload");
    }

    #[test]
    fn wrong_channel_is_rejected() {
        let flap = FlapBuffer::with_data(Channel::KeepAlive as u8, &b""[..]);
        assert_eq!(SnacBuffer::from_flap(&flap), Err(Error::NotASnacChannel(Channel::KeepAlive as u8)));
    }
}
