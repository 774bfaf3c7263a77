//! Stanza-level `<error/>` elements, as attached to `iq`/`message`/`presence`
//! stanzas of type `error`.

use icq_jid::Jid;
use icq_xml::Element;

/// The `urn:ietf:params:xml:ns:xmpp-stanzas` namespace defined conditions
/// and `<text/>` live in.
pub const NS_STANZAS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

/// The `type` attribute of a stanza error, governing whether/how the sender
/// should retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Retry after providing credentials.
    Auth,
    /// Do not retry.
    Cancel,
    /// Proceed; this was only a warning.
    Continue,
    /// Retry after changing the data sent.
    Modify,
    /// Retry after waiting.
    Wait,
}

impl ErrorType {
    fn as_str(self) -> &'static str {
        match self {
            ErrorType::Auth => "auth",
            ErrorType::Cancel => "cancel",
            ErrorType::Continue => "continue",
            ErrorType::Modify => "modify",
            ErrorType::Wait => "wait",
        }
    }

    fn from_str(s: &str) -> Option<ErrorType> {
        Some(match s {
            "auth" => ErrorType::Auth,
            "cancel" => ErrorType::Cancel,
            "continue" => ErrorType::Continue,
            "modify" => ErrorType::Modify,
            "wait" => ErrorType::Wait,
            _ => return None,
        })
    }
}

/// The defined stanza error conditions (RFC 6120 §8.3.3), minus `<gone/>`
/// and `<redirect/>`'s rarely-used extra namespaced attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinedCondition {
    /// Malformed request.
    BadRequest,
    /// A resource with this name/address already exists.
    Conflict,
    /// The feature is not implemented.
    FeatureNotImplemented,
    /// The requester lacks permission.
    Forbidden,
    /// The recipient can no longer be contacted, permanently.
    Gone {
        /// Alternate address, if given.
        new_address: Option<String>,
    },
    /// Server misconfiguration or internal error.
    InternalServerError,
    /// The addressed item does not exist.
    ItemNotFound,
    /// The JID violates XMPP address rules.
    JidMalformed,
    /// The request does not meet the recipient's criteria.
    NotAcceptable,
    /// The recipient does not allow this action for anyone.
    NotAllowed,
    /// Missing or bad credentials.
    NotAuthorized,
    /// A local service policy was violated.
    PolicyViolation,
    /// The recipient is temporarily unavailable.
    RecipientUnavailable,
    /// The recipient is redirecting, temporarily.
    Redirect {
        /// Alternate address, if given.
        new_address: Option<String>,
    },
    /// Prior registration is required.
    RegistrationRequired,
    /// A referenced remote server does not exist.
    RemoteServerNotFound,
    /// A referenced remote server could not be reached in time.
    RemoteServerTimeout,
    /// The server lacks the resources to service the request.
    ResourceConstraint,
    /// The service is not currently provided.
    ServiceUnavailable,
    /// Prior subscription is required.
    SubscriptionRequired,
    /// None of the other conditions apply.
    UndefinedCondition,
    /// The request arrived out of order.
    UnexpectedRequest,
}

impl DefinedCondition {
    fn name(&self) -> &'static str {
        match self {
            DefinedCondition::BadRequest => "bad-request",
            DefinedCondition::Conflict => "conflict",
            DefinedCondition::FeatureNotImplemented => "feature-not-implemented",
            DefinedCondition::Forbidden => "forbidden",
            DefinedCondition::Gone { .. } => "gone",
            DefinedCondition::InternalServerError => "internal-server-error",
            DefinedCondition::ItemNotFound => "item-not-found",
            DefinedCondition::JidMalformed => "jid-malformed",
            DefinedCondition::NotAcceptable => "not-acceptable",
            DefinedCondition::NotAllowed => "not-allowed",
            DefinedCondition::NotAuthorized => "not-authorized",
            DefinedCondition::PolicyViolation => "policy-violation",
            DefinedCondition::RecipientUnavailable => "recipient-unavailable",
            DefinedCondition::Redirect { .. } => "redirect",
            DefinedCondition::RegistrationRequired => "registration-required",
            DefinedCondition::RemoteServerNotFound => "remote-server-not-found",
            DefinedCondition::RemoteServerTimeout => "remote-server-timeout",
            DefinedCondition::ResourceConstraint => "resource-constraint",
            DefinedCondition::ServiceUnavailable => "service-unavailable",
            DefinedCondition::SubscriptionRequired => "subscription-required",
            DefinedCondition::UndefinedCondition => "undefined-condition",
            DefinedCondition::UnexpectedRequest => "unexpected-request",
        }
    }

    /// The canonical error type this condition SHOULD be paired with, used
    /// by [`StanzaError::from_condition`] when the caller doesn't specify
    /// one explicitly.
    pub fn canonical_type(&self) -> ErrorType {
        match self {
            DefinedCondition::BadRequest => ErrorType::Modify,
            DefinedCondition::Conflict => ErrorType::Cancel,
            DefinedCondition::FeatureNotImplemented => ErrorType::Cancel,
            DefinedCondition::Forbidden => ErrorType::Auth,
            DefinedCondition::Gone { .. } => ErrorType::Cancel,
            DefinedCondition::InternalServerError => ErrorType::Wait,
            DefinedCondition::ItemNotFound => ErrorType::Cancel,
            DefinedCondition::JidMalformed => ErrorType::Modify,
            DefinedCondition::NotAcceptable => ErrorType::Modify,
            DefinedCondition::NotAllowed => ErrorType::Cancel,
            DefinedCondition::NotAuthorized => ErrorType::Auth,
            DefinedCondition::PolicyViolation => ErrorType::Modify,
            DefinedCondition::RecipientUnavailable => ErrorType::Wait,
            DefinedCondition::Redirect { .. } => ErrorType::Modify,
            DefinedCondition::RegistrationRequired => ErrorType::Auth,
            DefinedCondition::RemoteServerNotFound => ErrorType::Cancel,
            DefinedCondition::RemoteServerTimeout => ErrorType::Wait,
            DefinedCondition::ResourceConstraint => ErrorType::Wait,
            DefinedCondition::ServiceUnavailable => ErrorType::Cancel,
            DefinedCondition::SubscriptionRequired => ErrorType::Auth,
            DefinedCondition::UndefinedCondition => ErrorType::Cancel,
            DefinedCondition::UnexpectedRequest => ErrorType::Wait,
        }
    }

    fn from_element(el: &Element) -> DefinedCondition {
        match el.name() {
            "bad-request" => DefinedCondition::BadRequest,
            "conflict" => DefinedCondition::Conflict,
            "feature-not-implemented" => DefinedCondition::FeatureNotImplemented,
            "forbidden" => DefinedCondition::Forbidden,
            "gone" => DefinedCondition::Gone {
                new_address: non_empty(el.text()),
            },
            "internal-server-error" => DefinedCondition::InternalServerError,
            "item-not-found" => DefinedCondition::ItemNotFound,
            "jid-malformed" => DefinedCondition::JidMalformed,
            "not-acceptable" => DefinedCondition::NotAcceptable,
            "not-allowed" => DefinedCondition::NotAllowed,
            "not-authorized" => DefinedCondition::NotAuthorized,
            "policy-violation" => DefinedCondition::PolicyViolation,
            "recipient-unavailable" => DefinedCondition::RecipientUnavailable,
            "redirect" => DefinedCondition::Redirect {
                new_address: non_empty(el.text()),
            },
            "registration-required" => DefinedCondition::RegistrationRequired,
            "remote-server-not-found" => DefinedCondition::RemoteServerNotFound,
            "remote-server-timeout" => DefinedCondition::RemoteServerTimeout,
            "resource-constraint" => DefinedCondition::ResourceConstraint,
            "service-unavailable" => DefinedCondition::ServiceUnavailable,
            "subscription-required" => DefinedCondition::SubscriptionRequired,
            "unexpected-request" => DefinedCondition::UnexpectedRequest,
            _ => DefinedCondition::UndefinedCondition,
        }
    }

    fn to_element(&self) -> Element {
        let mut el = Element::bare(self.name(), NS_STANZAS);
        let new_address = match self {
            DefinedCondition::Gone { new_address } | DefinedCondition::Redirect { new_address } => {
                new_address.clone()
            }
            _ => None,
        };
        if let Some(addr) = new_address {
            el.append_text_node(addr);
        }
        el
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// A stanza-level `<error/>`.
#[derive(Debug, Clone, PartialEq)]
pub struct StanzaError {
    /// The error type.
    pub type_: ErrorType,
    /// The entity that generated this error, if given.
    pub by: Option<Jid>,
    /// The defined condition.
    pub defined_condition: DefinedCondition,
    /// Human-readable text, with an optional `xml:lang`.
    pub text: Option<(String, String)>,
    /// An application-specific extension element.
    pub other: Option<Element>,
}

impl StanzaError {
    /// Builds an error with an explicit type.
    pub fn new(type_: ErrorType, defined_condition: DefinedCondition, text: Option<&str>) -> StanzaError {
        StanzaError {
            type_,
            by: None,
            defined_condition,
            text: text.map(|t| (String::new(), t.to_string())),
            other: None,
        }
    }

    /// Builds an error whose type is derived from `condition`'s canonical
    /// mapping (e.g. `BadRequest` ⇒ `Modify`, `NotAuthorized` ⇒ `Auth`).
    pub fn from_condition(condition: DefinedCondition, text: Option<&str>) -> StanzaError {
        let type_ = condition.canonical_type();
        StanzaError::new(type_, condition, text)
    }

    /// Parses a stanza `<error/>` element.
    pub fn from_element(el: &Element) -> Option<StanzaError> {
        let type_ = ErrorType::from_str(el.attr("type")?)?;
        let by = el.attr("by").and_then(|s| s.parse().ok());
        let mut defined_condition = None;
        let mut text = None;
        let mut other = None;
        for child in el.children() {
            if child.ns() == NS_STANZAS {
                if child.name() == "text" {
                    let lang = child.attr("xml:lang").unwrap_or("").to_string();
                    text = Some((lang, child.text()));
                } else if defined_condition.is_none() {
                    defined_condition = Some(DefinedCondition::from_element(child));
                }
            } else if other.is_none() {
                other = Some(child.clone());
            }
        }
        Some(StanzaError {
            type_,
            by,
            defined_condition: defined_condition.unwrap_or(DefinedCondition::UndefinedCondition),
            text,
            other,
        })
    }

    /// Appends `<error type='T'><COND/>[<text/>][<app/>]</error>` as a
    /// child of `root`.
    pub fn push_to_dom(&self, root: &mut Element) {
        let mut el = Element::builder("error", root.ns().to_string())
            .attr("type", self.type_.as_str())
            .append(self.defined_condition.to_element());
        if let Some(by) = &self.by {
            el = el.attr("by", by.to_string());
        }
        if let Some((lang, text)) = &self.text {
            let mut text_el = Element::builder("text", NS_STANZAS);
            if !lang.is_empty() {
                text_el = text_el.attr("xml:lang", lang.clone());
            }
            el = el.append(text_el.append_text(text.clone()).build());
        }
        if let Some(other) = &self.other {
            el = el.append(other.clone());
        }
        root.append_child(el.build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_mapping_matches_the_examples_given() {
        assert_eq!(DefinedCondition::BadRequest.canonical_type(), ErrorType::Modify);
        assert_eq!(DefinedCondition::NotAuthorized.canonical_type(), ErrorType::Auth);
        assert_eq!(DefinedCondition::InternalServerError.canonical_type(), ErrorType::Wait);
        assert_eq!(DefinedCondition::ItemNotFound.canonical_type(), ErrorType::Cancel);
        assert_eq!(DefinedCondition::RecipientUnavailable.canonical_type(), ErrorType::Wait);
        assert_eq!(DefinedCondition::Forbidden.canonical_type(), ErrorType::Auth);
        assert_eq!(DefinedCondition::NotAllowed.canonical_type(), ErrorType::Cancel);
    }

    #[test]
    fn push_to_dom_then_parse_roundtrips() {
        let mut root = Element::bare("iq", "jabber:component:accept");
        let err = StanzaError::from_condition(DefinedCondition::ItemNotFound, None);
        err.push_to_dom(&mut root);
        let parsed = StanzaError::from_element(root.get_child("error", "jabber:component:accept").unwrap()).unwrap();
        assert_eq!(parsed.type_, ErrorType::Cancel);
        assert_eq!(parsed.defined_condition, DefinedCondition::ItemNotFound);
    }

    #[test]
    fn gone_carries_its_new_address() {
        let err = StanzaError::new(
            ErrorType::Cancel,
            DefinedCondition::Gone { new_address: Some("xmpp:old@example.org".into()) },
            None,
        );
        let mut root = Element::bare("presence", "jabber:component:accept");
        err.push_to_dom(&mut root);
        let parsed = StanzaError::from_element(root.get_child("error", "jabber:component:accept").unwrap()).unwrap();
        assert_eq!(
            parsed.defined_condition,
            DefinedCondition::Gone { new_address: Some("xmpp:old@example.org".into()) }
        );
    }
}
