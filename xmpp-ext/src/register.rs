//! In-Band Registration (XEP-0077): the `jabber:iq:register` query a legacy
//! user sends to register, update, or cancel their gateway account.

use icq_xml::Element;

/// The in-band registration namespace.
pub const NS_REGISTER: &str = "jabber:iq:register";

/// A `<query xmlns='jabber:iq:register'/>`, used both for the empty form the
/// gateway offers and for the filled-in submission a client sends back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterQuery {
    /// Human-readable instructions, present on the form the gateway offers.
    pub instructions: Option<String>,
    /// The legacy account name (ICQ UIN), present on a submission.
    pub username: Option<String>,
    /// The legacy account password, present on a submission.
    pub password: Option<String>,
    /// Present when the client is asking to cancel its registration.
    pub remove: bool,
}

impl RegisterQuery {
    /// Builds the empty registration form the gateway replies with for an
    /// `iq get`.
    pub fn empty_form(instructions: &str) -> RegisterQuery {
        RegisterQuery {
            instructions: Some(instructions.to_owned()),
            username: Some(String::new()),
            password: Some(String::new()),
            remove: false,
        }
    }

    /// Parses a `<query xmlns='jabber:iq:register'/>` element.
    pub fn from_element(el: &Element) -> Option<RegisterQuery> {
        if !el.is("query", NS_REGISTER) {
            return None;
        }
        let mut query = RegisterQuery::default();
        for child in el.children() {
            match child.name() {
                "instructions" => query.instructions = Some(child.text()),
                "username" => query.username = Some(child.text()),
                "password" => query.password = Some(child.text()),
                "remove" => query.remove = true,
                _ => {}
            }
        }
        Some(query)
    }

    /// Renders this query as a `<query xmlns='jabber:iq:register'/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::bare("query", NS_REGISTER);
        if let Some(instructions) = &self.instructions {
            el.append_child(
                Element::builder("instructions", NS_REGISTER)
                    .append_text(instructions.clone())
                    .build(),
            );
        }
        if let Some(username) = &self.username {
            el.append_child(
                Element::builder("username", NS_REGISTER)
                    .append_text(username.clone())
                    .build(),
            );
        }
        if let Some(password) = &self.password {
            el.append_child(
                Element::builder("password", NS_REGISTER)
                    .append_text(password.clone())
                    .build(),
            );
        }
        if self.remove {
            el.append_child(Element::bare("remove", NS_REGISTER));
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_form_has_instructions_and_blank_fields() {
        let form = RegisterQuery::empty_form("Enter your ICQ UIN and password.");
        let el = form.to_element();
        assert!(el.get_child("instructions", NS_REGISTER).is_some());
        assert_eq!(el.get_child("username", NS_REGISTER).unwrap().text(), "");
    }

    #[test]
    fn submission_roundtrips_username_and_password() {
        let submitted = RegisterQuery {
            instructions: None,
            username: Some("123456".into()),
            password: Some("hunter2".into()),
            remove: false,
        };
        let parsed = RegisterQuery::from_element(&submitted.to_element()).unwrap();
        assert_eq!(parsed.username.as_deref(), Some("123456"));
        assert_eq!(parsed.password.as_deref(), Some("hunter2"));
        assert!(!parsed.remove);
    }

    #[test]
    fn remove_element_sets_the_flag() {
        let mut el = Element::bare("query", NS_REGISTER);
        el.append_child(Element::bare("remove", NS_REGISTER));
        let parsed = RegisterQuery::from_element(&el).unwrap();
        assert!(parsed.remove);
    }
}
