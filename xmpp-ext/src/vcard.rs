//! vCard-temp (XEP-0054), limited to the fields the gateway can actually
//! populate from legacy short user details: nickname, name, and a
//! description built from the contact's capability list.

use icq_xml::Element;

/// The legacy vCard namespace.
pub const NS_VCARD: &str = "vcard-temp";

/// A `<vCard xmlns='vcard-temp'/>`. Only the fields the gateway fills in are
/// represented; anything else present on the wire is ignored on parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VCard {
    /// `<NICKNAME/>`.
    pub nickname: Option<String>,
    /// `<FN/>`, the formatted full name.
    pub fullname: Option<String>,
    /// `<N><FAMILY/></N>`.
    pub family_name: Option<String>,
    /// `<N><GIVEN/></N>`.
    pub given_name: Option<String>,
    /// `<DESC/>`.
    pub description: Option<String>,
}

impl VCard {
    /// Parses a `<vCard xmlns='vcard-temp'/>` element.
    pub fn from_element(el: &Element) -> Option<VCard> {
        if !el.is("vCard", NS_VCARD) {
            return None;
        }
        let mut vcard = VCard::default();
        for child in el.children() {
            match child.name() {
                "NICKNAME" => vcard.nickname = Some(child.text()),
                "FN" => vcard.fullname = Some(child.text()),
                "N" => {
                    for part in child.children() {
                        match part.name() {
                            "FAMILY" => vcard.family_name = Some(part.text()),
                            "GIVEN" => vcard.given_name = Some(part.text()),
                            _ => {}
                        }
                    }
                }
                "DESC" => vcard.description = Some(child.text()),
                _ => {}
            }
        }
        Some(vcard)
    }

    /// Renders this vCard as a `<vCard xmlns='vcard-temp'/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::bare("vCard", NS_VCARD);
        if let Some(nickname) = &self.nickname {
            el.append_child(
                Element::builder("NICKNAME", NS_VCARD)
                    .append_text(nickname.clone())
                    .build(),
            );
        }
        if let Some(fullname) = &self.fullname {
            el.append_child(
                Element::builder("FN", NS_VCARD)
                    .append_text(fullname.clone())
                    .build(),
            );
        }
        if self.family_name.is_some() || self.given_name.is_some() {
            let mut name = Element::bare("N", NS_VCARD);
            if let Some(family) = &self.family_name {
                name.append_child(
                    Element::builder("FAMILY", NS_VCARD)
                        .append_text(family.clone())
                        .build(),
                );
            }
            if let Some(given) = &self.given_name {
                name.append_child(
                    Element::builder("GIVEN", NS_VCARD)
                        .append_text(given.clone())
                        .build(),
                );
            }
            el.append_child(name);
        }
        if let Some(description) = &self.description {
            el.append_child(
                Element::builder("DESC", NS_VCARD)
                    .append_text(description.clone())
                    .build(),
            );
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_name_parts_and_nickname() {
        let vcard = VCard {
            nickname: Some("neo".into()),
            fullname: Some("Thomas Anderson".into()),
            family_name: Some("Anderson".into()),
            given_name: Some("Thomas".into()),
            description: Some("Avatar, UTF-8 messages".into()),
        };
        let parsed = VCard::from_element(&vcard.to_element()).unwrap();
        assert_eq!(parsed, vcard);
    }

    #[test]
    fn unknown_element_is_not_a_vcard() {
        assert!(VCard::from_element(&Element::bare("query", "jabber:iq:register")).is_none());
    }

    #[test]
    fn omits_name_element_when_no_name_parts_are_set() {
        let vcard = VCard {
            nickname: Some("neo".into()),
            ..Default::default()
        };
        let el = vcard.to_element();
        assert!(el.get_child("N", NS_VCARD).is_none());
    }
}
