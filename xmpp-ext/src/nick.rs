//! User Nickname (XEP-0172): a `<nick/>` carried alongside presence or a
//! roster exchange item to suggest a display name.

use icq_xml::Element;

/// The nickname namespace.
pub const NS_NICK: &str = "http://jabber.org/protocol/nick";

/// A `<nick xmlns='http://jabber.org/protocol/nick'/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nick(pub String);

impl Nick {
    /// Parses a `<nick/>` element.
    pub fn from_element(el: &Element) -> Option<Nick> {
        if !el.is("nick", NS_NICK) {
            return None;
        }
        Some(Nick(el.text()))
    }

    /// Renders this nickname as a `<nick/>` element.
    pub fn to_element(&self) -> Element {
        Element::builder("nick", NS_NICK).append_text(self.0.clone()).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let nick = Nick("neo".into());
        assert_eq!(Nick::from_element(&nick.to_element()), Some(nick));
    }
}
