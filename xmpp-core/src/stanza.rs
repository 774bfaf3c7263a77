//! The three first-level stanza kinds a component stream carries, built
//! on top of [`icq_xml::Element`] rather than a dedicated per-stanza DOM.

use std::sync::atomic::{AtomicU64, Ordering};

use icq_jid::Jid;
use icq_xml::Element;

use crate::component::NS_COMPONENT_ACCEPT;
use crate::stanza_error::StanzaError;

/// Produces the monotonically increasing, hex-rendered ids this component
/// stamps on locally originated IQs. No two in-flight IQs share an id.
#[derive(Debug, Default)]
pub struct IdGenerator(AtomicU64);

impl IdGenerator {
    /// Starts a fresh generator at zero.
    pub fn new() -> IdGenerator {
        IdGenerator(AtomicU64::new(0))
    }

    /// Returns the next id in the sequence.
    pub fn next(&self) -> String {
        format!("{:x}", self.0.fetch_add(1, Ordering::Relaxed))
    }
}

fn parse_jid(s: Option<&str>) -> Option<Jid> {
    s.and_then(|s| s.parse().ok())
}

fn set_addr(el: &mut Element, name: &str, jid: &Option<Jid>) {
    match jid {
        Some(j) => el.set_attr(name, j.to_string()),
        None => {
            el.remove_attr(name);
        }
    }
}

/// `iq` type values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IqType {
    /// A request for information.
    Get,
    /// A request to change state.
    Set,
    /// A successful reply.
    Result,
    /// An error reply.
    Error,
}

impl IqType {
    fn as_str(self) -> &'static str {
        match self {
            IqType::Get => "get",
            IqType::Set => "set",
            IqType::Result => "result",
            IqType::Error => "error",
        }
    }

    fn from_str(s: &str) -> Option<IqType> {
        Some(match s {
            "get" => IqType::Get,
            "set" => IqType::Set,
            "result" => IqType::Result,
            "error" => IqType::Error,
            _ => return None,
        })
    }
}

/// An `<iq/>` stanza. Carries exactly one payload child, whose qname is the
/// namespaced request/reply (e.g. `jabber:iq:register/query`).
#[derive(Debug, Clone)]
pub struct Iq {
    /// The stanza id.
    pub id: String,
    /// The IQ type.
    pub type_: IqType,
    /// The sender, if given.
    pub from: Option<Jid>,
    /// The recipient, if given.
    pub to: Option<Jid>,
    payload: Option<Element>,
}

impl Iq {
    /// Builds a new IQ with the given type and payload, and no id yet (the
    /// caller should assign one via an [`IdGenerator`] before sending).
    pub fn new(type_: IqType, payload: Element) -> Iq {
        Iq { id: String::new(), type_, from: None, to: None, payload: Some(payload) }
    }

    /// The current payload child, if any.
    pub fn payload(&self) -> Option<&Element> {
        self.payload.as_ref()
    }

    /// Replaces the payload child. Setting a new child replaces whatever
    /// was there before — an IQ carries at most one.
    pub fn set_payload(&mut self, payload: Element) {
        self.payload = Some(payload);
    }

    /// Swaps `from`/`to`, useful when turning a request into its reply. If
    /// the original `to` was empty, the new `from` ends up cleared, and
    /// symmetrically for `to`.
    pub fn swap_from_to(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    /// Builds an error reply: type `error`, addresses swapped, same id,
    /// with `err` as the sole payload.
    pub fn error_reply(&self, err: StanzaError) -> Iq {
        let mut reply = self.clone();
        reply.type_ = IqType::Error;
        reply.swap_from_to();
        let mut holder = Element::bare("iq", NS_COMPONENT_ACCEPT);
        err.push_to_dom(&mut holder);
        reply.payload = holder.children().next().cloned();
        reply
    }

    /// Renders this IQ as an `<iq/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::builder(
            "iq",
            NS_COMPONENT_ACCEPT,
        )
        .attr("type", self.type_.as_str())
        .attr("id", self.id.clone())
        .build();
        set_addr(&mut el, "from", &self.from);
        set_addr(&mut el, "to", &self.to);
        if let Some(payload) = &self.payload {
            el.append_child(payload.clone());
        }
        el
    }

    /// Parses an `<iq/>` element.
    pub fn from_element(el: &Element) -> Option<Iq> {
        let type_ = IqType::from_str(el.attr("type")?)?;
        Some(Iq {
            id: el.attr("id").unwrap_or_default().to_string(),
            type_,
            from: parse_jid(el.attr("from")),
            to: parse_jid(el.attr("to")),
            payload: el.children().next().cloned(),
        })
    }
}

/// `<message/>` type values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// A one-to-one conversational message.
    Chat,
    /// A standalone message with no conversational context.
    Normal,
    /// Groupchat traffic (unused by this gateway, recognised for completeness).
    Groupchat,
    /// A headline-style notification.
    Headline,
    /// An error reply.
    Error,
}

impl MessageType {
    fn as_str(self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Normal => "normal",
            MessageType::Groupchat => "groupchat",
            MessageType::Headline => "headline",
            MessageType::Error => "error",
        }
    }

    fn from_str(s: &str) -> MessageType {
        match s {
            "chat" => MessageType::Chat,
            "groupchat" => MessageType::Groupchat,
            "headline" => MessageType::Headline,
            "error" => MessageType::Error,
            _ => MessageType::Normal,
        }
    }
}

/// A `<message/>` stanza.
#[derive(Debug, Clone)]
pub struct Message {
    /// The stanza id.
    pub id: Option<String>,
    /// The message type; absent on the wire defaults to `Normal`.
    pub type_: MessageType,
    /// The sender, if given.
    pub from: Option<Jid>,
    /// The recipient, if given.
    pub to: Option<Jid>,
    /// The `<body/>` text, if any.
    pub body: Option<String>,
    /// The `<subject/>` text, if any.
    pub subject: Option<String>,
    /// The `<thread/>` text, if any.
    pub thread: Option<String>,
    /// Any other children (extensions), carried verbatim.
    pub extensions: Vec<Element>,
}

impl Message {
    /// Builds a bare chat message with a body.
    pub fn chat(to: Jid, body: impl Into<String>) -> Message {
        Message {
            id: None,
            type_: MessageType::Chat,
            from: None,
            to: Some(to),
            body: Some(body.into()),
            subject: None,
            thread: None,
            extensions: Vec::new(),
        }
    }

    /// Renders this message as a `<message/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::builder("message", NS_COMPONENT_ACCEPT)
            .attr("type", self.type_.as_str())
            .build();
        if let Some(id) = &self.id {
            el.set_attr("id", id.clone());
        }
        set_addr(&mut el, "from", &self.from);
        set_addr(&mut el, "to", &self.to);
        if let Some(subject) = &self.subject {
            el.append_child(Element::builder("subject", NS_COMPONENT_ACCEPT).append_text(subject.clone()).build());
        }
        if let Some(body) = &self.body {
            el.append_child(Element::builder("body", NS_COMPONENT_ACCEPT).append_text(body.clone()).build());
        }
        if let Some(thread) = &self.thread {
            el.append_child(Element::builder("thread", NS_COMPONENT_ACCEPT).append_text(thread.clone()).build());
        }
        for ext in &self.extensions {
            el.append_child(ext.clone());
        }
        el
    }

    /// Parses a `<message/>` element.
    pub fn from_element(el: &Element) -> Message {
        let type_ = el.attr("type").map(MessageType::from_str).unwrap_or(MessageType::Normal);
        let mut body = None;
        let mut subject = None;
        let mut thread = None;
        let mut extensions = Vec::new();
        for child in el.children() {
            match child.name() {
                "body" if body.is_none() => body = Some(child.text()),
                "subject" if subject.is_none() => subject = Some(child.text()),
                "thread" if thread.is_none() => thread = Some(child.text()),
                _ => extensions.push(child.clone()),
            }
        }
        Message {
            id: el.attr("id").map(String::from),
            type_,
            from: parse_jid(el.attr("from")),
            to: parse_jid(el.attr("to")),
            body,
            subject,
            thread,
            extensions,
        }
    }
}

/// `<presence/>` type values; `None` on the wire means "available".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceType {
    /// No longer available.
    Unavailable,
    /// Requesting a subscription.
    Subscribe,
    /// Granting a subscription.
    Subscribed,
    /// Cancelling a subscription.
    Unsubscribe,
    /// Revoking a subscription.
    Unsubscribed,
    /// Requesting the other party's current presence.
    Probe,
    /// An error reply.
    Error,
}

impl PresenceType {
    fn as_str(self) -> &'static str {
        match self {
            PresenceType::Unavailable => "unavailable",
            PresenceType::Subscribe => "subscribe",
            PresenceType::Subscribed => "subscribed",
            PresenceType::Unsubscribe => "unsubscribe",
            PresenceType::Unsubscribed => "unsubscribed",
            PresenceType::Probe => "probe",
            PresenceType::Error => "error",
        }
    }

    fn from_str(s: &str) -> Option<PresenceType> {
        Some(match s {
            "unavailable" => PresenceType::Unavailable,
            "subscribe" => PresenceType::Subscribe,
            "subscribed" => PresenceType::Subscribed,
            "unsubscribe" => PresenceType::Unsubscribe,
            "unsubscribed" => PresenceType::Unsubscribed,
            "probe" => PresenceType::Probe,
            "error" => PresenceType::Error,
            _ => return None,
        })
    }
}

/// The `<show/>` value of an available presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Show {
    /// No `<show/>` element: plain "available".
    None,
    /// Away.
    Away,
    /// Extended away ("not available").
    Xa,
    /// Do not disturb.
    Dnd,
    /// Free to chat.
    Chat,
}

impl Show {
    fn as_str(self) -> Option<&'static str> {
        match self {
            Show::None => None,
            Show::Away => Some("away"),
            Show::Xa => Some("xa"),
            Show::Dnd => Some("dnd"),
            Show::Chat => Some("chat"),
        }
    }

    fn from_str(s: &str) -> Show {
        match s {
            "away" => Show::Away,
            "xa" => Show::Xa,
            "dnd" => Show::Dnd,
            "chat" => Show::Chat,
            _ => Show::None,
        }
    }
}

/// A `<presence/>` stanza.
#[derive(Debug, Clone)]
pub struct Presence {
    /// The stanza id.
    pub id: Option<String>,
    /// `None` when the type attribute is absent on the wire (available).
    pub type_: Option<PresenceType>,
    /// The sender, if given.
    pub from: Option<Jid>,
    /// The recipient, if given.
    pub to: Option<Jid>,
    /// The availability sub-state, for an available presence.
    pub show: Show,
    /// The `<status/>` text, if any.
    pub status: Option<String>,
    /// Any other children (extensions), carried verbatim.
    pub extensions: Vec<Element>,
}

impl Presence {
    /// Builds a plain directed presence stanza with the given type (or
    /// `None` for "available").
    pub fn new(type_: Option<PresenceType>, to: Jid) -> Presence {
        Presence {
            id: None,
            type_,
            from: None,
            to: Some(to),
            show: Show::None,
            status: None,
            extensions: Vec::new(),
        }
    }

    /// Renders this presence as a `<presence/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::bare("presence", NS_COMPONENT_ACCEPT);
        if let Some(type_) = self.type_ {
            el.set_attr("type", type_.as_str());
        }
        if let Some(id) = &self.id {
            el.set_attr("id", id.clone());
        }
        set_addr(&mut el, "from", &self.from);
        set_addr(&mut el, "to", &self.to);
        if let Some(show) = self.show.as_str() {
            el.append_child(Element::builder("show", NS_COMPONENT_ACCEPT).append_text(show).build());
        }
        if let Some(status) = &self.status {
            el.append_child(Element::builder("status", NS_COMPONENT_ACCEPT).append_text(status.clone()).build());
        }
        for ext in &self.extensions {
            el.append_child(ext.clone());
        }
        el
    }

    /// Parses a `<presence/>` element.
    pub fn from_element(el: &Element) -> Presence {
        let type_ = el.attr("type").and_then(PresenceType::from_str);
        let mut show = Show::None;
        let mut status = None;
        let mut extensions = Vec::new();
        for child in el.children() {
            match child.name() {
                "show" => show = Show::from_str(&child.text()),
                "status" if status.is_none() => status = Some(child.text()),
                _ => extensions.push(child.clone()),
            }
        }
        Presence {
            id: el.attr("id").map(String::from),
            type_,
            from: parse_jid(el.attr("from")),
            to: parse_jid(el.attr("to")),
            show,
            status,
            extensions,
        }
    }
}

/// Any first-level stanza a component stream carries.
#[derive(Debug, Clone)]
pub enum Stanza {
    /// An `<iq/>`.
    Iq(Iq),
    /// A `<message/>`.
    Message(Message),
    /// A `<presence/>`.
    Presence(Presence),
}

impl Stanza {
    /// Recognises `el` as a stanza, if its local name is one of the three
    /// first-level stanza kinds.
    pub fn from_element(el: &Element) -> Option<Stanza> {
        match el.name() {
            "iq" => Iq::from_element(el).map(Stanza::Iq),
            "message" => Some(Stanza::Message(Message::from_element(el))),
            "presence" => Some(Stanza::Presence(Presence::from_element(el))),
            _ => None,
        }
    }

    /// Renders this stanza as its element form.
    pub fn to_element(&self) -> Element {
        match self {
            Stanza::Iq(iq) => iq.to_element(),
            Stanza::Message(msg) => msg.to_element(),
            Stanza::Presence(pres) => pres.to_element(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generator_never_repeats() {
        let ids = IdGenerator::new();
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert_eq!(a, "0");
        assert_eq!(b, "1");
    }

    #[test]
    fn iq_swap_from_to_clears_empty_side() {
        let mut iq = Iq::new(IqType::Get, Element::bare("query", "jabber:iq:register"));
        iq.to = Some("gateway.example.org".parse().unwrap());
        iq.swap_from_to();
        assert!(iq.to.is_none());
        assert_eq!(iq.from.unwrap().to_string(), "gateway.example.org");
    }

    #[test]
    fn iq_payload_replace_keeps_exactly_one() {
        let mut iq = Iq::new(IqType::Set, Element::bare("query", "jabber:iq:register"));
        iq.set_payload(Element::bare("vCard", "vcard-temp"));
        assert_eq!(iq.payload().unwrap().name(), "vCard");
    }

    #[test]
    fn message_roundtrips_body_and_type() {
        let mut msg = Message::chat("user@gateway.example.org".parse().unwrap(), "hello");
        msg.from = Some("123456@gateway.example.org".parse().unwrap());
        let el = msg.to_element();
        let parsed = Message::from_element(&el);
        assert_eq!(parsed.type_, MessageType::Chat);
        assert_eq!(parsed.body.as_deref(), Some("hello"));
    }

    #[test]
    fn presence_without_type_attribute_parses_as_available() {
        let el = Element::bare("presence", NS_COMPONENT_ACCEPT);
        let pres = Presence::from_element(&el);
        assert_eq!(pres.type_, None);
        assert_eq!(pres.show, Show::None);
    }

    #[test]
    fn stanza_from_element_dispatches_by_name() {
        let el = Element::builder("iq", NS_COMPONENT_ACCEPT).attr("type", "get").build();
        assert!(matches!(Stanza::from_element(&el), Some(Stanza::Iq(_))));
        let el = Element::bare("presence", NS_COMPONENT_ACCEPT);
        assert!(matches!(Stanza::from_element(&el), Some(Stanza::Presence(_))));
        let el = Element::bare("nonsense", NS_COMPONENT_ACCEPT);
        assert!(Stanza::from_element(&el).is_none());
    }
}
