//! Meta-info (family `0x0015`) directory requests: user-info lookups and
//! the offline-message fetch, both wrapped in the same little-endian
//! sub-header and keyed by a per-connection sequence number.

use crate::error::Result;
use crate::message::{parse_offline_message, Message};
use icq_wire::{Buffer, SnacBuffer};

/// Meta-info request/response type codes this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaInfoType {
    /// Short user-info request.
    ShortUserInfo,
    /// Offline-message fetch.
    OfflineMessages,
    /// End-of-offline-queue marker; seeing this must trigger a purge request.
    EndOfOfflineMessages,
    /// Any type this client does not assign special meaning to.
    Other(u16),
}

impl MetaInfoType {
    fn to_u16(self) -> u16 {
        match self {
            MetaInfoType::ShortUserInfo => 0x04BA,
            MetaInfoType::OfflineMessages => 0x0041,
            MetaInfoType::EndOfOfflineMessages => 0x0042,
            MetaInfoType::Other(code) => code,
        }
    }

    fn from_u16(code: u16) -> MetaInfoType {
        match code {
            0x04BA => MetaInfoType::ShortUserInfo,
            0x0041 => MetaInfoType::OfflineMessages,
            0x0042 => MetaInfoType::EndOfOfflineMessages,
            other => MetaInfoType::Other(other),
        }
    }
}

/// Tracks the per-connection meta-info request sequence, which starts at 1
/// (the first request pre-increments from 0), not 0.
#[derive(Debug, Default)]
pub struct MetaInfoManager {
    sequence: u16,
    own_uin: u32,
}

impl MetaInfoManager {
    /// Creates a manager for the given account's UIN.
    pub fn new(own_uin: u32) -> MetaInfoManager {
        MetaInfoManager { sequence: 0, own_uin }
    }

    /// Builds a meta-info request SNAC `(0x15,0x02)` wrapping `body` in the
    /// little-endian sub-header every meta-info request shares.
    pub fn build_request(&mut self, ty: MetaInfoType, body: &[u8]) -> SnacBuffer {
        self.sequence = self.sequence.wrapping_add(1).max(1);
        let mut buf = Buffer::new();
        buf.add_le_word((body.len() + 8) as u16);
        buf.add_le_dword(self.own_uin);
        buf.add_le_word(ty.to_u16());
        buf.add_le_word(self.sequence);
        buf.add_data(body);
        SnacBuffer::with_data(0x0015, 0x0002, buf.into_bytes())
    }

    /// Builds a short user-info request for `uin`.
    pub fn request_short_user_info(&mut self, uin: &str) -> SnacBuffer {
        let mut body = Buffer::new();
        body.add_le_dword(uin.parse::<u32>().unwrap_or(0));
        self.build_request(MetaInfoType::ShortUserInfo, &body.into_bytes())
    }

    /// Builds an offline-message fetch request.
    pub fn request_offline_messages(&mut self) -> SnacBuffer {
        self.build_request(MetaInfoType::OfflineMessages, &[])
    }

    /// Builds the server-side delete request (`0x003E`) that must follow an
    /// end-of-offline-queue marker (`0x0042`). Safe to call again without
    /// waiting for an acknowledgement.
    pub fn request_purge_offline_messages(&mut self) -> SnacBuffer {
        self.build_request(MetaInfoType::Other(0x003E), &[])
    }

    /// Parses a meta-info reply SNAC `(0x15,0x03)`, returning its type and
    /// the sub-header-stripped body for the caller to interpret further.
    pub fn parse_reply<'a>(&self, snac: &'a SnacBuffer) -> Result<(MetaInfoType, Buffer)> {
        let mut buf = Buffer::from(snac.payload());
        let _chunk_len = buf.get_le_word()?;
        let _uin = buf.get_le_dword()?;
        let ty = MetaInfoType::from_u16(buf.get_le_word()?);
        let _seq = buf.get_le_word()?;
        let rest = buf.read_all();
        Ok((ty, Buffer::from(rest)))
    }

    /// Parses the body of an offline-message fetch reply into individual
    /// messages, one block per stored offline message.
    pub fn parse_offline_messages(&self, mut body: Buffer) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while body.bytes_available() > 0 {
            messages.push(parse_offline_message(&mut body)?);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one() {
        let mut mgr = MetaInfoManager::new(12345);
        let snac = mgr.request_offline_messages();
        let mut buf = Buffer::from(snac.payload());
        buf.seek_forward(2 + 4 + 2); // chunk length + uin + type
        assert_eq!(buf.get_le_word().unwrap(), 1);
    }

    #[test]
    fn sequence_increments_each_request() {
        let mut mgr = MetaInfoManager::new(12345);
        mgr.request_offline_messages();
        let snac = mgr.request_offline_messages();
        let mut buf = Buffer::from(snac.payload());
        buf.seek_forward(8);
        assert_eq!(buf.get_le_word().unwrap(), 2);
    }

    #[test]
    fn reply_roundtrips_type_and_sequence() {
        let mut mgr = MetaInfoManager::new(12345);
        let request = mgr.request_short_user_info("999");
        let mut payload = Buffer::from(request.payload());
        let chunk_len = payload.get_le_word().unwrap();
        let uin = payload.get_le_dword().unwrap();
        let ty = payload.get_le_word().unwrap();
        let seq = payload.get_le_word().unwrap();
        let rest = payload.read_all();

        let mut reply_body = Buffer::new();
        reply_body.add_le_word(chunk_len);
        reply_body.add_le_dword(uin);
        reply_body.add_le_word(ty);
        reply_body.add_le_word(seq);
        reply_body.add_data(&rest);
        let reply = SnacBuffer::with_data(0x0015, 0x0003, reply_body.into_bytes());

        let (parsed_ty, _) = mgr.parse_reply(&reply).unwrap();
        assert_eq!(parsed_ty, MetaInfoType::ShortUserInfo);
    }
}
