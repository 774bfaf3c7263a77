//! Stream-level error conditions (RFC 3920 §4.7): unlike a stanza error, a
//! stream error is always fatal — the entity that detects it sends the
//! error, closes the stream, and tears down the connection.

use icq_xml::Element;

/// The streams namespace error conditions live in.
pub const NS_STREAMS: &str = "urn:ietf:params:xml:ns:xmpp-streams";

/// One of the defined stream-error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorCondition {
    /// The entity has sent XML that cannot be processed.
    BadFormat,
    /// An unsupported or missing namespace prefix was used.
    BadNamespacePrefix,
    /// A new stream conflicts with the one already active for this entity.
    Conflict,
    /// No traffic was seen on the stream for the configured idle period.
    ConnectionTimeout,
    /// The `to` hostname is no longer hosted by the server.
    HostGone,
    /// The `to` hostname is not hosted by the server.
    HostUnknown,
    /// A server-to-server stanza is missing a `to` or `from`.
    ImproperAddressing,
    /// The server hit a misconfiguration or otherwise-undefined internal error.
    InternalServerError,
    /// The `from` address does not match an authorized identity.
    InvalidFrom,
    /// The stream or dialback id is invalid.
    InvalidId,
    /// The streams namespace is not the one this server speaks.
    InvalidNamespace,
    /// The entity sent invalid XML.
    InvalidXml,
    /// Data arrived before the stream was authenticated.
    NotAuthorized,
    /// A local service policy was violated.
    PolicyViolation,
    /// A remote connection required for authentication/authorization failed.
    RemoteConnectionFailed,
    /// The server lacks the resources to service the stream.
    ResourceConstraint,
    /// The entity sent restricted XML (comments, PIs, DTDs, entities, ...).
    RestrictedXml,
    /// The server is redirecting the entity to another host.
    SeeOtherHost,
    /// The server is shutting down.
    SystemShutdown,
    /// None of the other conditions apply.
    UndefinedCondition,
    /// The stream was encoded in an encoding the server does not support.
    UnsupportedEncoding,
    /// A first-level child of the stream is not supported.
    UnsupportedStanzaType,
    /// The requested XMPP version is not supported.
    UnsupportedVersion,
    /// The entity sent XML that is not well-formed.
    XmlNotWellFormed,
}

impl StreamErrorCondition {
    /// The element name this condition is serialised under.
    pub fn as_str(self) -> &'static str {
        use StreamErrorCondition::*;
        match self {
            BadFormat => "bad-format",
            BadNamespacePrefix => "bad-namespace-prefix",
            Conflict => "conflict",
            ConnectionTimeout => "connection-timeout",
            HostGone => "host-gone",
            HostUnknown => "host-unknown",
            ImproperAddressing => "improper-addressing",
            InternalServerError => "internal-server-error",
            InvalidFrom => "invalid-from",
            InvalidId => "invalid-id",
            InvalidNamespace => "invalid-namespace",
            InvalidXml => "invalid-xml",
            NotAuthorized => "not-authorized",
            PolicyViolation => "policy-violation",
            RemoteConnectionFailed => "remote-connection-failed",
            ResourceConstraint => "resource-constraint",
            RestrictedXml => "restricted-xml",
            SeeOtherHost => "see-other-host",
            SystemShutdown => "system-shutdown",
            UndefinedCondition => "undefined-condition",
            UnsupportedEncoding => "unsupported-encoding",
            UnsupportedStanzaType => "unsupported-stanza-type",
            UnsupportedVersion => "unsupported-version",
            XmlNotWellFormed => "xml-not-well-formed",
        }
    }

    /// Parses a condition element name, falling back to `UndefinedCondition`
    /// for anything unrecognised (mirroring the original implementation).
    pub fn from_str(name: &str) -> StreamErrorCondition {
        use StreamErrorCondition::*;
        match name {
            "bad-format" => BadFormat,
            "bad-namespace-prefix" => BadNamespacePrefix,
            "conflict" => Conflict,
            "connection-timeout" => ConnectionTimeout,
            "host-gone" => HostGone,
            "host-unknown" => HostUnknown,
            "improper-addressing" => ImproperAddressing,
            "internal-server-error" => InternalServerError,
            "invalid-from" => InvalidFrom,
            "invalid-id" => InvalidId,
            "invalid-namespace" => InvalidNamespace,
            "invalid-xml" => InvalidXml,
            "not-authorized" => NotAuthorized,
            "policy-violation" => PolicyViolation,
            "remote-connection-failed" => RemoteConnectionFailed,
            "resource-constraint" => ResourceConstraint,
            "restricted-xml" => RestrictedXml,
            "see-other-host" => SeeOtherHost,
            "system-shutdown" => SystemShutdown,
            "unsupported-encoding" => UnsupportedEncoding,
            "unsupported-stanza-type" => UnsupportedStanzaType,
            "unsupported-version" => UnsupportedVersion,
            "xml-not-well-formed" => XmlNotWellFormed,
            _ => UndefinedCondition,
        }
    }
}

/// A `<stream:error/>`: a defined condition, an optional human-readable
/// text, and an optional application-specific child outside the streams
/// namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamError {
    /// The defined error condition.
    pub condition: StreamErrorCondition,
    /// Human-readable description, if the peer sent one.
    pub text: Option<String>,
    /// The first child element outside `NS_STREAMS`, if any.
    pub app_spec: Option<Element>,
}

impl StreamError {
    /// Builds a stream error with no text and no app-specific child.
    pub fn new(condition: StreamErrorCondition) -> StreamError {
        StreamError { condition, text: None, app_spec: None }
    }

    /// Parses a `<stream:error/>` element. Only the first defined-condition
    /// child, the first `text` child, and the first non-streams-namespace
    /// child are recognised; extras are ignored.
    pub fn from_element(el: &Element) -> StreamError {
        let mut condition = None;
        let mut text = None;
        let mut app_spec = None;
        for child in el.children() {
            if child.ns() == NS_STREAMS {
                if child.name() == "text" {
                    if text.is_none() {
                        text = Some(child.text());
                    }
                } else if condition.is_none() {
                    condition = Some(StreamErrorCondition::from_str(child.name()));
                }
            } else if app_spec.is_none() {
                app_spec = Some(child.clone());
            }
        }
        StreamError {
            condition: condition.unwrap_or(StreamErrorCondition::UndefinedCondition),
            text,
            app_spec,
        }
    }

    /// Renders this error as a `<stream:error/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::bare("stream:error", "");
        el.append_child(Element::bare(self.condition.as_str(), NS_STREAMS));
        if let Some(text) = &self.text {
            el.append_child(
                Element::builder("text", NS_STREAMS)
                    .append_text(text.clone())
                    .build(),
            );
        }
        if let Some(app_spec) = &self.app_spec {
            el.append_child(app_spec.clone());
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_condition_and_text() {
        let mut err = StreamError::new(StreamErrorCondition::HostUnknown);
        err.text = Some("no such vhost".into());
        let el = err.to_element();
        let parsed = StreamError::from_element(&el);
        assert_eq!(parsed.condition, StreamErrorCondition::HostUnknown);
        assert_eq!(parsed.text.as_deref(), Some("no such vhost"));
    }

    #[test]
    fn unknown_condition_name_falls_back_to_undefined() {
        let mut el = Element::bare("error", "");
        el.append_child(Element::bare("something-made-up", NS_STREAMS));
        let parsed = StreamError::from_element(&el);
        assert_eq!(parsed.condition, StreamErrorCondition::UndefinedCondition);
    }

    #[test]
    fn as_str_round_trips_through_from_str() {
        let conditions = [
            StreamErrorCondition::BadFormat,
            StreamErrorCondition::SeeOtherHost,
            StreamErrorCondition::XmlNotWellFormed,
        ];
        for c in conditions {
            assert_eq!(StreamErrorCondition::from_str(c.as_str()), c);
        }
    }
}
