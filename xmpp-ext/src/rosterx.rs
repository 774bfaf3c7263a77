//! Roster Item Exchange (XEP-0144): how the gateway pushes the legacy
//! contact list to the XMPP side as a suggestion the client may accept.

use icq_jid::Jid;
use icq_xml::Element;

/// The roster item exchange namespace.
pub const NS_ROSTERX: &str = "http://jabber.org/protocol/rosterx";

/// The suggested action for a roster exchange item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeAction {
    /// Suggest adding this item to the roster.
    Add,
    /// Suggest deleting this item from the roster.
    Delete,
    /// Suggest changing this item's name or groups.
    Modify,
}

impl ExchangeAction {
    fn as_str(self) -> &'static str {
        match self {
            ExchangeAction::Add => "add",
            ExchangeAction::Delete => "delete",
            ExchangeAction::Modify => "modify",
        }
    }

    fn from_str(s: &str) -> Option<ExchangeAction> {
        match s {
            "add" => Some(ExchangeAction::Add),
            "delete" => Some(ExchangeAction::Delete),
            "modify" => Some(ExchangeAction::Modify),
            _ => None,
        }
    }
}

/// A single `<item/>` of a roster exchange payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeItem {
    /// What the receiving client is being asked to do.
    pub action: ExchangeAction,
    /// The JID this item refers to, e.g. `uin@gateway`.
    pub jid: Jid,
    /// A display name for the contact.
    pub name: Option<String>,
    /// Roster groups to place the contact in.
    pub groups: Vec<String>,
}

impl ExchangeItem {
    fn from_element(el: &Element) -> Option<ExchangeItem> {
        let action = ExchangeAction::from_str(el.attr("action")?)?;
        let jid: Jid = el.attr("jid")?.parse().ok()?;
        let name = el.attr("name").map(str::to_owned);
        let groups = el
            .children()
            .filter(|c| c.name() == "group")
            .map(|c| c.text())
            .collect();
        Some(ExchangeItem { action, jid, name, groups })
    }

    fn to_element(&self) -> Element {
        let mut builder = Element::builder("item", NS_ROSTERX)
            .attr("action", self.action.as_str())
            .attr("jid", self.jid.to_string());
        if let Some(name) = &self.name {
            builder = builder.attr("name", name.clone());
        }
        let mut el = builder.build();
        for group in &self.groups {
            el.append_child(
                Element::builder("group", NS_ROSTERX)
                    .append_text(group.clone())
                    .build(),
            );
        }
        el
    }
}

/// An `<x xmlns='http://jabber.org/protocol/rosterx'/>` payload, normally
/// carried inside a `message` stanza.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterExchange {
    /// The items being suggested, in document order.
    pub items: Vec<ExchangeItem>,
}

impl RosterExchange {
    /// Builds a roster exchange that suggests adding every given contact.
    pub fn adding(contacts: impl IntoIterator<Item = (Jid, String)>) -> RosterExchange {
        RosterExchange {
            items: contacts
                .into_iter()
                .map(|(jid, name)| ExchangeItem {
                    action: ExchangeAction::Add,
                    jid,
                    name: Some(name),
                    groups: Vec::new(),
                })
                .collect(),
        }
    }

    /// Parses an `<x xmlns='http://jabber.org/protocol/rosterx'/>` element.
    pub fn from_element(el: &Element) -> Option<RosterExchange> {
        if !el.is("x", NS_ROSTERX) {
            return None;
        }
        let items = el.children().filter_map(ExchangeItem::from_element).collect();
        Some(RosterExchange { items })
    }

    /// Renders this exchange as an `<x xmlns='http://jabber.org/protocol/rosterx'/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::bare("x", NS_ROSTERX);
        for item in &self.items {
            el.append_child(item.to_element());
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_builds_one_add_item_per_contact() {
        let exchange = RosterExchange::adding([
            ("123456@gateway".parse().unwrap(), "Alice".to_string()),
            ("654321@gateway".parse().unwrap(), "Bob".to_string()),
        ]);
        assert_eq!(exchange.items.len(), 2);
        assert!(exchange.items.iter().all(|i| i.action == ExchangeAction::Add));
    }

    #[test]
    fn roundtrips_through_xml() {
        let exchange = RosterExchange::adding([("123456@gateway".parse().unwrap(), "Alice".to_string())]);
        let parsed = RosterExchange::from_element(&exchange.to_element()).unwrap();
        assert_eq!(parsed, exchange);
    }

    #[test]
    fn item_missing_action_is_skipped_not_fatal() {
        let mut el = Element::bare("x", NS_ROSTERX);
        el.append_child(Element::builder("item", NS_ROSTERX).attr("jid", "a@b").build());
        let parsed = RosterExchange::from_element(&el).unwrap();
        assert!(parsed.items.is_empty());
    }
}
