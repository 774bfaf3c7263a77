//! An incremental XML event stream for XMPP component streams, built on
//! [`rxml`] — the same parser `minidom` and `tokio-xmpp` use underneath
//! their own DOM and stream types.
//!
//! `rxml::Parser` is reader-agnostic: it is fed raw bytes and yields fully
//! resolved [`rxml::Event`]s (namespace resolution, encoding detection and
//! well-formedness checking all happen inside it). [`XmlStreamParser`] just
//! drives that parser and folds its flat event stream into the shape a
//! component stream actually wants: the opening `<stream:stream>` tag, each
//! complete first-level child as a whole [`Element`], and the closing tag.

use crate::element::Element;
use crate::error::Error;

/// One parsed event out of an XML document stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The document's root element has opened (the `<stream:stream ...>`
    /// tag of a component stream). Only the root's own namespace, local
    /// name and attributes are reported; its children arrive one at a time
    /// as [`Event::Element`].
    DocumentOpen {
        /// The root element's namespace.
        ns: String,
        /// The root element's local name.
        local: String,
        /// The root element's attributes, in document order.
        attrs: Vec<(String, String)>,
    },
    /// A complete first-level child of the root has been parsed.
    Element(Element),
    /// The root element has closed.
    DocumentClose,
    /// The underlying parser rejected the input.
    Error(Error),
}

/// An incremental, stateful XML parser over a byte stream.
///
/// Bytes arrive via [`feed`](XmlStreamParser::feed) in arbitrarily small or
/// large chunks (as they come off a socket); each call returns the events
/// that became available as a result. A parser that has emitted an
/// [`Event::Error`] is dead and will not accept further input.
pub struct XmlStreamParser {
    parser: rxml::Parser,
    stack: Vec<Element>,
    root_open: bool,
    dead: bool,
}

impl XmlStreamParser {
    /// Creates a new parser ready to receive the start of a document.
    pub fn new() -> XmlStreamParser {
        XmlStreamParser {
            parser: rxml::Parser::default(),
            stack: Vec::new(),
            root_open: false,
            dead: false,
        }
    }

    /// Feeds a chunk of bytes into the parser, returning the events it was
    /// able to produce from them. Once an [`Event::Error`] has been
    /// returned, further calls return an empty vector.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        if self.dead {
            return Vec::new();
        }
        self.parser.feed(bytes);
        let mut out = Vec::new();
        loop {
            match self.parser.parse() {
                Ok(Some(ev)) => {
                    if let Some(event) = self.handle_rxml_event(ev) {
                        out.push(event);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    self.dead = true;
                    out.push(Event::Error(Error::from(err)));
                    break;
                }
            }
        }
        out
    }

    fn handle_rxml_event(&mut self, ev: rxml::Event) -> Option<Event> {
        match ev {
            // Nobody downstream cares about the XML declaration itself.
            rxml::Event::XmlDeclaration(..) => None,
            rxml::Event::StartElement(_, (ns, name), attrs) => {
                let attrs: Vec<(String, String)> = attrs
                    .into_iter()
                    .map(|((_ns, key), value)| (key.to_string(), value.to_string()))
                    .collect();
                if !self.root_open {
                    self.root_open = true;
                    Some(Event::DocumentOpen {
                        ns: ns.to_string(),
                        local: name.to_string(),
                        attrs,
                    })
                } else {
                    let mut el = Element::bare(name.to_string(), ns.to_string());
                    for (k, v) in attrs {
                        el.set_attr(k, v);
                    }
                    self.stack.push(el);
                    None
                }
            }
            rxml::Event::Text(_, data) => {
                if let Some(top) = self.stack.last_mut() {
                    top.append_text_node(data.to_string());
                }
                None
            }
            rxml::Event::EndElement(_) => match self.stack.pop() {
                Some(el) => {
                    if let Some(parent) = self.stack.last_mut() {
                        parent.append_child(el);
                        None
                    } else {
                        Some(Event::Element(el))
                    }
                }
                None => {
                    self.root_open = false;
                    Some(Event::DocumentClose)
                }
            },
        }
    }
}

impl Default for XmlStreamParser {
    fn default() -> XmlStreamParser {
        XmlStreamParser::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_open_then_element_then_close() {
        let mut parser = XmlStreamParser::new();
        let mut events = parser.feed(
            b"<stream:stream xmlns:stream='http://etherx.jabber.org/streams' \
              xmlns='jabber:component:accept' to='icq.example.org'>",
        );
        assert_eq!(events.len(), 1);
        match events.remove(0) {
            Event::DocumentOpen { local, attrs, .. } => {
                assert_eq!(local, "stream");
                assert!(attrs.iter().any(|(k, v)| k == "to" && v == "icq.example.org"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let mut events = parser.feed(b"<message type='chat'><body>hi</body></message>");
        assert_eq!(events.len(), 1);
        match events.remove(0) {
            Event::Element(el) => {
                assert_eq!(el.name(), "message");
                let body = el.get_child("body", "jabber:component:accept").unwrap();
                assert_eq!(body.text(), "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let events = parser.feed(b"</stream:stream>");
        assert_eq!(events, vec![Event::DocumentClose]);
    }

    #[test]
    fn incremental_feed_waits_for_full_element() {
        let mut parser = XmlStreamParser::new();
        parser.feed(b"<stream:stream xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:component:accept'>");
        assert!(parser.feed(b"<presence><show>").is_empty());
        let events = parser.feed(b"away</show></presence>");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Element(el) if el.name() == "presence"));
    }

    #[test]
    fn nested_children_are_preserved() {
        let mut parser = XmlStreamParser::new();
        parser.feed(b"<stream:stream xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:component:accept'>");
        let mut events = parser.feed(
            b"<iq type='set' id='1'><query xmlns='jabber:iq:register'><username>bob</username></query></iq>",
        );
        assert_eq!(events.len(), 1);
        match events.remove(0) {
            Event::Element(iq) => {
                let query = iq.get_child("query", "jabber:iq:register").unwrap();
                let username = query.get_child("username", "jabber:iq:register").unwrap();
                assert_eq!(username.text(), "bob");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_tag_yields_error() {
        let mut parser = XmlStreamParser::new();
        parser.feed(b"<stream:stream xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:component:accept'>");
        let events = parser.feed(b"<message><body>hi</wrong></message>");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Error(_)));

        // The parser is dead after an error; further input yields nothing.
        assert!(parser.feed(b"<foo/>").is_empty());
    }
}
