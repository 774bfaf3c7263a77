//! FLAP framing — the six-byte envelope every OSCAR packet travels in.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use bytes::Bytes;

/// Marks the start of every FLAP header.
pub const FLAP_MARKER: u8 = 0x2A;
/// Size of a FLAP header: marker, channel, sequence, length.
pub const FLAP_HEADER_SIZE: usize = 6;

/// FLAP channel numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    /// Carries the initial login/authorization handshake.
    Auth = 0x1,
    /// Carries SNAC commands — almost everything after login.
    Data = 0x2,
    /// Carries a fatal error before the connection is dropped.
    Error = 0x3,
    /// Signals the connection is closing.
    Close = 0x4,
    /// An empty frame sent to keep the connection alive.
    KeepAlive = 0x5,
}

impl Channel {
    /// Maps a raw channel byte to a known [`Channel`], if recognised.
    pub fn from_u8(byte: u8) -> Option<Channel> {
        match byte {
            0x1 => Some(Channel::Auth),
            0x2 => Some(Channel::Data),
            0x3 => Some(Channel::Error),
            0x4 => Some(Channel::Close),
            0x5 => Some(Channel::KeepAlive),
            _ => None,
        }
    }
}

/// A single FLAP frame: a channel, sequence number, and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlapBuffer {
    channel: u8,
    sequence: u16,
    payload: Bytes,
}

impl FlapBuffer {
    /// Creates an empty frame on the given channel.
    pub fn new(channel: u8) -> FlapBuffer {
        FlapBuffer { channel, sequence: 0, payload: Bytes::new() }
    }

    /// Creates a frame carrying `data` on the given channel.
    pub fn with_data(channel: u8, data: impl Into<Bytes>) -> FlapBuffer {
        FlapBuffer { channel, sequence: 0, payload: data.into() }
    }

    /// The frame's channel.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Sets the frame's channel.
    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
    }

    /// The frame's sequence number.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Sets the frame's sequence number.
    pub fn set_sequence(&mut self, sequence: u16) {
        self.sequence = sequence;
    }

    /// The frame's payload, not including the header.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of the payload, as would be reported in the header.
    pub fn flap_data_size(&self) -> u16 {
        self.payload.len() as u16
    }

    /// The six-byte FLAP header alone.
    pub fn header_bytes(&self) -> [u8; FLAP_HEADER_SIZE] {
        let mut b = Buffer::new();
        b.add_byte(FLAP_MARKER);
        b.add_byte(self.channel);
        b.add_word(self.sequence);
        b.add_word(self.flap_data_size());
        let bytes = b.into_bytes();
        let mut out = [0u8; FLAP_HEADER_SIZE];
        out.copy_from_slice(&bytes);
        out
    }

    /// Serialises the full frame: header followed by payload.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(FLAP_HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header_bytes());
        out.extend_from_slice(&self.payload);
        Bytes::from(out)
    }

    /// Attempts to decode one complete frame from the front of `data`.
    ///
    /// Returns `Ok(None)` when fewer bytes than a full frame are buffered
    /// so far (the caller should read more and retry), or `Ok(Some((frame,
    /// consumed)))` once a whole frame is available.
    pub fn try_decode(data: &[u8]) -> Result<Option<(FlapBuffer, usize)>> {
        if data.len() < FLAP_HEADER_SIZE {
            return Ok(None);
        }
        if data[0] != FLAP_MARKER {
            return Err(Error::BadFlapMarker(data[0]));
        }
        let channel = data[1];
        let sequence = u16::from_be_bytes([data[2], data[3]]);
        let len = u16::from_be_bytes([data[4], data[5]]) as usize;
        if data.len() < FLAP_HEADER_SIZE + len {
            return Ok(None);
        }
        let payload = Bytes::copy_from_slice(&data[FLAP_HEADER_SIZE..FLAP_HEADER_SIZE + len]);
        Ok(Some((FlapBuffer { channel, sequence, payload }, FLAP_HEADER_SIZE + len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut flap = FlapBuffer::with_data(Channel::Data as u8, &b"hello"[..]);
        flap.set_sequence(7);
        let bytes = flap.to_bytes();
        let (decoded, consumed) = FlapBuffer::try_decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.channel(), Channel::Data as u8);
        assert_eq!(decoded.sequence(), 7);
        assert_eq!(decoded.payload(), b"hello");
    }

    #[test]
    fn partial_frame_asks_for_more() {
        let flap = FlapBuffer::with_data(Channel::Data as u8, &b"hello world"[..]);
        let bytes = flap.to_bytes();
        assert_eq!(FlapBuffer::try_decode(&bytes[..4]).unwrap(), None);
        assert_eq!(FlapBuffer::try_decode(&bytes[..FLAP_HEADER_SIZE + 2]).unwrap(), None);
    }

    #[test]
    fn bad_marker_is_rejected() {
        let mut bytes = vec![0u8; FLAP_HEADER_SIZE];
        bytes[0] = 0x00;
        assert_eq!(FlapBuffer::try_decode(&bytes), Err(Error::BadFlapMarker(0x00)));
    }
}
