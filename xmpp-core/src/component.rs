//! The `jabber:component:accept` stream: a single TCP connection to a local
//! XMPP server, authenticated with a shared secret instead of SASL, over
//! which this process appears as a server-side component under its own
//! domain-only JID.

use std::collections::VecDeque;

use digest::Digest;
use sha1::Sha1;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::stanza::{IdGenerator, Stanza};
use crate::stream_error::StreamError;
use icq_xml::{Element, Event, XmlStreamParser};

/// The component-stream namespace.
pub const NS_COMPONENT_ACCEPT: &str = "jabber:component:accept";
/// The namespace stream-level framing elements live in.
pub const NS_STREAMS: &str = "http://etherx.jabber.org/streams";

const READ_CHUNK: usize = 4096;

/// Something the component stream observed.
#[derive(Debug)]
pub enum ComponentEvent {
    /// The handshake succeeded; normal traffic may now flow both ways.
    StreamReady,
    /// A first-level stanza arrived.
    Stanza(Stanza),
    /// The peer sent a `<stream:error/>`.
    StreamError(StreamError),
}

fn handshake_hash(session_id: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(session_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// A connected, authenticated component stream.
pub struct ComponentStream {
    stream: TcpStream,
    parser: XmlStreamParser,
    pending: VecDeque<Event>,
    session_id: String,
    ids: IdGenerator,
}

impl ComponentStream {
    /// Connects to `host:port`, opens the stream to `domain`, and completes
    /// the handshake with `secret`. Returns once the component may send and
    /// receive ordinary stanzas.
    pub async fn connect(host: &str, port: u16, domain: &str, secret: &str) -> Result<ComponentStream> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::Transport(format!("connecting to {host}:{port}: {e}")))?;
        let mut me = ComponentStream {
            stream,
            parser: XmlStreamParser::new(),
            pending: VecDeque::new(),
            session_id: String::new(),
            ids: IdGenerator::new(),
        };
        me.open_stream(domain).await?;
        me.complete_handshake(secret).await?;
        Ok(me)
    }

    /// The id generator for locally originated IQs on this stream.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    async fn open_stream(&mut self, domain: &str) -> Result<()> {
        let header = format!(
            "<?xml version='1.0'?><stream:stream xmlns:stream='{NS_STREAMS}' xmlns='{NS_COMPONENT_ACCEPT}' to='{domain}'>"
        );
        self.write_raw(header.as_bytes()).await?;
        loop {
            match self.next_raw_event().await? {
                Event::DocumentOpen { attrs, .. } => {
                    self.session_id = attrs
                        .into_iter()
                        .find(|(k, _)| k == "id")
                        .map(|(_, v)| v)
                        .unwrap_or_default();
                    return Ok(());
                }
                Event::Error(e) => return Err(e.into()),
                _ => continue,
            }
        }
    }

    async fn complete_handshake(&mut self, secret: &str) -> Result<()> {
        let hex = handshake_hash(&self.session_id, secret);
        let handshake = Element::builder("handshake", NS_COMPONENT_ACCEPT)
            .append_text(hex)
            .build();
        self.write_element(&handshake).await?;
        loop {
            match self.next_raw_event().await? {
                Event::Element(el) if el.is("handshake", NS_COMPONENT_ACCEPT) && el.attrs().next().is_none() => {
                    return Ok(());
                }
                Event::Element(_) => return Err(Error::HandshakeFailed),
                Event::DocumentClose => return Err(Error::Disconnected),
                Event::Error(e) => return Err(e.into()),
                Event::DocumentOpen { .. } => continue,
            }
        }
    }

    /// Reads and interprets the next stream-level occurrence: a stanza, a
    /// stream error, or (only once, before this returns) the ready signal
    /// is already implied by a successful [`ComponentStream::connect`].
    pub async fn next_event(&mut self) -> Result<ComponentEvent> {
        loop {
            match self.next_raw_event().await? {
                Event::Element(el) if el.is("error", NS_STREAMS) => {
                    return Ok(ComponentEvent::StreamError(StreamError::from_element(&el)));
                }
                Event::Element(el) => match Stanza::from_element(&el) {
                    Some(stanza) => return Ok(ComponentEvent::Stanza(stanza)),
                    None => log::debug!("ignoring unrecognised first-level element <{}>", el.name()),
                },
                Event::DocumentClose => return Err(Error::Disconnected),
                Event::Error(e) => return Err(e.into()),
                Event::DocumentOpen { .. } => continue,
            }
        }
    }

    /// Sends a stanza, assigning a fresh id first if it doesn't already
    /// have one (only `Iq` carries a mandatory id in this model).
    pub async fn send_stanza(&mut self, mut stanza: Stanza) -> Result<()> {
        if let Stanza::Iq(iq) = &mut stanza {
            if iq.id.is_empty() {
                iq.id = self.ids.next();
            }
        }
        self.write_element(&stanza.to_element()).await
    }

    /// Closes the stream cleanly with a `</stream:stream>` tag.
    pub async fn close(&mut self) -> Result<()> {
        self.write_raw(b"</stream:stream>").await
    }

    async fn next_raw_event(&mut self) -> Result<Event> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Ok(ev);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| Error::Transport(format!("reading from component stream: {e}")))?;
            if n == 0 {
                return Ok(Event::DocumentClose);
            }
            self.pending.extend(self.parser.feed(&chunk[..n]));
        }
    }

    async fn write_element(&mut self, el: &Element) -> Result<()> {
        self.write_raw(el.to_string().as_bytes()).await
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| Error::Transport(format!("writing to component stream: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_hash_matches_sha1_of_id_and_secret() {
        let hash = handshake_hash("sid", "123456");
        assert_eq!(hash, "9accec263ab84a43c6037ccf7cd48cb1d3f6df8e");
    }
}
