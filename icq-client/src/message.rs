//! Instant messages: channel 1 (plain), channel 2 (rendezvous/server-relay,
//! used for ICQ-to-ICQ text), and channel 4 (legacy short messages), plus
//! the offline-message block format delivered over meta-info.

use crate::capability;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use icq_wire::{Buffer, Guid, SnacBuffer, Tlv, TlvChain};

/// Text encoding tag carried (implicitly or explicitly) by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEncoding {
    /// No encoding was declared; treat as the configured legacy codec.
    UserDefined,
    /// US-ASCII.
    Ascii,
    /// ISO-8859-1.
    Latin1,
    /// UTF-8.
    Utf8,
    /// UCS-2 (as ICQ calls UTF-16BE without surrogate support).
    Ucs2,
}

/// Set on a [`Message`] when the server flagged it auto-response/offline/etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageFlags(pub u8);

impl MessageFlags {
    /// The message was an automated reply (TLV `0x04` was present).
    pub const AUTO: MessageFlags = MessageFlags(0x01);
}

/// One instant message, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    channel: u16,
    ty: u8,
    flags: u8,
    icbm_cookie: [u8; 8],
    sender: String,
    receiver: String,
    text: Vec<u8>,
    timestamp: DateTime<Utc>,
    encoding: MessageEncoding,
}

impl Message {
    /// Builds an outbound message; the ICBM cookie is filled in by the
    /// message manager at send time.
    pub fn new(receiver: impl Into<String>, text: impl Into<Vec<u8>>) -> Message {
        Message {
            channel: 2,
            ty: 0,
            flags: 0,
            icbm_cookie: [0; 8],
            sender: String::new(),
            receiver: receiver.into(),
            text: text.into(),
            timestamp: Utc::now(),
            encoding: MessageEncoding::UserDefined,
        }
    }

    /// The ICBM channel this message travelled (or will travel) on.
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Sets the channel.
    pub fn set_channel(&mut self, channel: u16) {
        self.channel = channel;
    }

    /// The message subtype byte (server-defined, channel 2/4 only).
    pub fn ty(&self) -> u8 {
        self.ty
    }

    /// Sets the message subtype byte.
    pub fn set_type(&mut self, ty: u8) {
        self.ty = ty;
    }

    /// Raw message flags.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Sets the raw message flags.
    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    /// True if the auto-response flag is set.
    pub fn is_auto_response(&self) -> bool {
        self.flags & MessageFlags::AUTO.0 != 0
    }

    /// The 8-byte ICBM cookie correlating request/ack/offline-delivery.
    pub fn icbm_cookie(&self) -> [u8; 8] {
        self.icbm_cookie
    }

    /// Sets the ICBM cookie.
    pub fn set_icbm_cookie(&mut self, cookie: [u8; 8]) {
        self.icbm_cookie = cookie;
    }

    /// The sender's UIN.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Sets the sender's UIN.
    pub fn set_sender(&mut self, sender: impl Into<String>) {
        self.sender = sender.into();
    }

    /// The receiver's UIN.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Sets the receiver's UIN.
    pub fn set_receiver(&mut self, receiver: impl Into<String>) {
        self.receiver = receiver.into();
    }

    /// The message body, in its declared [`MessageEncoding`].
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Sets the message body.
    pub fn set_text(&mut self, text: impl Into<Vec<u8>>) {
        self.text = text.into();
    }

    /// When this message was sent (offline messages carry the original
    /// server timestamp; live messages are stamped on receipt).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Sets the timestamp.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// The message's declared encoding.
    pub fn encoding(&self) -> MessageEncoding {
        self.encoding
    }

    /// Sets the message's declared encoding.
    pub fn set_encoding(&mut self, encoding: MessageEncoding) {
        self.encoding = encoding;
    }
}

/// Generates a fresh ICBM cookie from a per-session monotonic counter, the
/// same correlation role the original's per-send random value played.
pub fn next_icbm_cookie(counter: &mut u64) -> [u8; 8] {
    *counter = counter.wrapping_add(1);
    counter.to_be_bytes()
}

/// Builds the SNAC `(0x04,0x06)` for an outbound message on channel 1 or 2.
///
/// Channel 2 (server-relay) carries a nested rendezvous TLV `0x2711` whose
/// inner field layout beyond the header this module fills in is taken from
/// the request/ack shape the original client sent; a server that rejects a
/// field here should be cross-checked against a canonical OSCAR reference
/// rather than this module alone (see the open question this carries over).
pub fn build_outbound_snac(msg: &Message) -> SnacBuffer {
    let mut body = Buffer::new();
    body.add_data(&msg.icbm_cookie);
    body.add_word(msg.channel);
    body.add_byte(msg.receiver.len() as u8);
    body.add_data(msg.receiver.as_bytes());

    let inner = match msg.channel {
        2 => encode_channel_2_rendezvous(msg),
        _ => encode_channel_1_fragment(msg),
    };
    let mut chain = TlvChain::new();
    chain.add_tlv(Tlv::with_data(0x0005, inner));
    body.add_data(&chain.to_bytes());

    let mut snac = SnacBuffer::with_data(0x0004, 0x0006, body.into_bytes());
    snac.set_request_id(0);
    snac
}

fn encode_channel_1_fragment(msg: &Message) -> bytes::Bytes {
    let mut fragment = Buffer::new();
    fragment.add_byte(0x01); // fragment ident: message text
    fragment.add_byte(0x01); // fragment version
    fragment.add_word((msg.text.len() + 4) as u16);
    fragment.add_word(0x0000); // charset number
    fragment.add_word(0x0000); // charset subset
    fragment.add_data(&msg.text);
    fragment.into_bytes()
}

fn encode_channel_2_rendezvous(msg: &Message) -> bytes::Bytes {
    let mut inner = Buffer::new();
    inner.add_word(0x0000); // message type: request
    inner.add_data(&msg.icbm_cookie);
    inner.add_data(capability::icq_server_relay().data());

    let mut payload = Buffer::new();
    payload.add_byte(msg.ty);
    payload.add_byte(msg.flags);
    payload.add_le_word(0x0000); // status code
    payload.add_le_word(0x0000); // priority code
    payload.add_le_word((msg.text.len() + 1) as u16);
    payload.add_data(&msg.text);
    payload.add_byte(0x00); // null terminator
    payload.add_dword(0); // text color
    payload.add_dword(0); // background color

    let mut rendezvous = Buffer::new();
    rendezvous.add_le_word(0x001B); // protocol version
    rendezvous.add_data(capability::icq_server_relay().data());
    rendezvous.add_le_word(0x0000); // unknown
    rendezvous.add_le_dword(0x0000_0003); // capability flags
    rendezvous.add_byte(0x00); // unknown
    rendezvous.add_le_word(0x0000); // downcounter
    rendezvous.add_le_word(0x0000); // trailing data length
    rendezvous.add_data(&payload.into_bytes());

    let mut chain = TlvChain::new();
    chain.add(0x2711, rendezvous.into_bytes());
    inner.add_data(&chain.to_bytes());
    inner.into_bytes()
}

/// Parses a channel-1 message body out of its TLV chain.
pub fn parse_channel_1(chain: &TlvChain) -> Result<Message> {
    let mut msg = Message::new(String::new(), Vec::new());
    if chain.has(0x0004) {
        msg.set_flags(MessageFlags::AUTO.0);
    }
    let caps_tlv = chain
        .get(0x0002)
        .ok_or_else(|| Error::Malformed("channel-1 message missing capability TLV 0x0002".into()))?;
    let mut caps_buf = Buffer::from(caps_tlv.payload());
    caps_buf.seek_forward(2); // fragment ident (0x05) + version (0x01)
    let mut caps_size = caps_buf.get_word()?;
    let mut caps = Vec::new();
    while caps_size > 0 {
        let raw = caps_buf.get_block(16)?;
        caps.push(Guid::from_slice(&raw)?);
        caps_size -= 16;
    }
    log::debug!("inbound channel-1 message capabilities: {caps:?}");
    caps_buf.seek_forward(2); // fragment ident (0x01) + version (0x01)
    let msg_size = caps_buf.get_word()?;
    caps_buf.seek_forward(4); // charset number + subset
    let text = caps_buf.get_block(msg_size as usize - 4)?;
    msg.set_text(text.to_vec());
    Ok(msg)
}

/// Parses a channel-2 (server-relay) message body out of its TLV chain.
pub fn parse_channel_2(chain: &TlvChain) -> Result<Message> {
    let mut msg = Message::new(String::new(), Vec::new());
    let block = chain
        .get(0x0005)
        .ok_or_else(|| Error::Malformed("channel-2 message missing TLV 0x0005".into()))?;
    let mut buf = Buffer::from(block.payload());
    buf.seek_forward(2); // message type
    buf.seek_forward(8); // message cookie, duplicated from the SNAC header
    let cap = Guid::from_slice(&buf.get_block(16)?)?;
    log::debug!("channel-2 message capability: {cap}");

    let rest = buf.read_all();
    let inner = TlvChain::from_bytes(rest.to_vec())?;
    let rendezvous = inner
        .get(0x2711)
        .ok_or_else(|| Error::Malformed("channel-2 message missing rendezvous TLV 0x2711".into()))?;
    let mut r = Buffer::from(rendezvous.payload());
    let proto_ver = r.get_le_word()?;
    log::debug!("channel-2 protocol version {proto_ver:#06x}");
    r.seek_forward(16); // capability, repeated
    r.seek_forward(2); // unknown
    r.get_le_dword()?; // capability flags
    r.seek_forward(1); // unknown
    r.seek_forward(2); // downcounter
    let data_len = r.get_le_word()? as usize;
    let _ = data_len;

    msg.set_type(r.get_byte()?);
    msg.set_flags(r.get_byte()?);
    r.seek_forward(2); // status code
    r.seek_forward(2); // priority code
    let text_len = r.get_le_word()?;
    let text = r.get_block(text_len as usize - 1)?;
    r.seek_forward(1); // null terminator
    msg.set_text(text.to_vec());
    Ok(msg)
}

/// Parses a channel-4 (legacy short message) body out of its TLV chain.
pub fn parse_channel_4(chain: &TlvChain) -> Result<Message> {
    let mut msg = Message::new(String::new(), Vec::new());
    let block = chain
        .get(0x0005)
        .ok_or_else(|| Error::Malformed("channel-4 message missing TLV 0x0005".into()))?;
    let mut buf = Buffer::from(block.payload());
    let sender = buf.get_le_dword()?;
    let ty = buf.get_byte()?;
    let flags = buf.get_byte()?;
    let len = buf.get_le_word()?;
    let text = buf.get_block(len as usize - 1)?;
    msg.set_sender(sender.to_string());
    msg.set_type(ty);
    msg.set_flags(flags);
    msg.set_text(text.to_vec());
    Ok(msg)
}

/// Parses one offline-message block (meta-info type `0x41`).
pub fn parse_offline_message(data: &mut Buffer) -> Result<Message> {
    let sender = data.get_le_dword()?;
    let year = data.get_le_word()?;
    let month = data.get_byte()?;
    let day = data.get_byte()?;
    let hour = data.get_byte()?;
    let minute = data.get_byte()?;
    let ty = data.get_byte()?;
    let flags = data.get_byte()?;
    let len = data.get_word()?;
    let text = data.get_block(len as usize - 1)?;

    let timestamp = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, 0))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(Utc::now);

    let mut msg = Message::new(String::new(), Vec::new());
    msg.set_sender(sender.to_string());
    msg.set_type(ty);
    msg.set_flags(flags);
    msg.set_text(text.to_vec());
    msg.set_timestamp(timestamp);
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_message_timestamp_is_utc() {
        let mut buf = Buffer::new();
        buf.add_le_dword(12345);
        buf.add_le_word(2024);
        buf.add_byte(3);
        buf.add_byte(14);
        buf.add_byte(9);
        buf.add_byte(30);
        buf.add_byte(0);
        buf.add_byte(0);
        buf.add_word(4);
        buf.add_data(b"hi!");
        let mut reader = Buffer::from(buf.data());
        let msg = parse_offline_message(&mut reader).unwrap();
        assert_eq!(msg.sender(), "12345");
        assert_eq!(msg.text(), b"hi!");
        assert_eq!(msg.timestamp().format("%Y-%m-%d %H:%M").to_string(), "2024-03-14 09:30");
    }

    #[test]
    fn channel_1_roundtrip() {
        let mut msg = Message::new("", b"hello there".to_vec());
        msg.set_channel(1);
        let snac = build_outbound_snac(&msg);
        let mut buf = Buffer::from(snac.payload());
        buf.seek_forward(8 + 2 + 1); // cookie + channel + receiver length (empty)
        let chain = TlvChain::from_bytes(buf.read_all().to_vec()).unwrap();
        let block = chain.get(0x0005).unwrap();
        let mut inner = Buffer::from(block.payload());
        inner.seek_forward(2); // fragment ident + version
        let len = inner.get_word().unwrap();
        inner.seek_forward(4); // charset number + subset
        let text = inner.get_block(len as usize - 4).unwrap();
        assert_eq!(&text[..], b"hello there");
    }

    #[test]
    fn channel_2_roundtrip() {
        let mut msg = Message::new("12345", b"ping".to_vec());
        msg.set_icbm_cookie([1, 2, 3, 4, 5, 6, 7, 8]);
        let snac = build_outbound_snac(&msg);
        let mut buf = Buffer::from(snac.payload());
        let cookie = buf.get_block(8).unwrap();
        assert_eq!(&cookie[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        let channel = buf.get_word().unwrap();
        assert_eq!(channel, 2);
        let receiver_len = buf.get_byte().unwrap() as usize;
        let receiver = buf.get_block(receiver_len).unwrap();
        assert_eq!(&receiver[..], b"12345");
        let chain = TlvChain::from_bytes(buf.read_all().to_vec()).unwrap();
        assert!(chain.has(0x0005));
    }
}
