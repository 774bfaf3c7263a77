//! Service Discovery (XEP-0030): what the gateway advertises about itself
//! and, on a per-node query, about an individual legacy contact.

use icq_jid::Jid;
use icq_xml::Element;

/// The `disco#info` namespace.
pub const NS_DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";
/// The `disco#items` namespace.
pub const NS_DISCO_ITEMS: &str = "http://jabber.org/protocol/disco#items";

/// An `<identity/>` of a disco#info result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The identity category, e.g. `gateway`.
    pub category: String,
    /// The identity type, e.g. `icq`.
    pub type_: String,
    /// A human-readable name for this identity.
    pub name: Option<String>,
}

impl Identity {
    /// Builds a new identity.
    pub fn new(category: &str, type_: &str, name: &str) -> Identity {
        Identity { category: category.to_owned(), type_: type_.to_owned(), name: Some(name.to_owned()) }
    }

    fn from_element(el: &Element) -> Option<Identity> {
        Some(Identity {
            category: el.attr("category")?.to_owned(),
            type_: el.attr("type")?.to_owned(),
            name: el.attr("name").map(str::to_owned),
        })
    }

    fn to_element(&self) -> Element {
        let mut builder = Element::builder("identity", NS_DISCO_INFO)
            .attr("category", self.category.clone())
            .attr("type", self.type_.clone());
        if let Some(name) = &self.name {
            builder = builder.attr("name", name.clone());
        }
        builder.build()
    }
}

/// A `<query xmlns='http://jabber.org/protocol/disco#info'/>` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoInfo {
    /// The node this result is scoped to, if any.
    pub node: Option<String>,
    /// Identities exposed for this entity/node.
    pub identities: Vec<Identity>,
    /// Feature namespaces supported for this entity/node.
    pub features: Vec<String>,
}

impl DiscoInfo {
    /// Parses a `<query xmlns='http://jabber.org/protocol/disco#info'/>` element.
    pub fn from_element(el: &Element) -> Option<DiscoInfo> {
        if !el.is("query", NS_DISCO_INFO) {
            return None;
        }
        let mut info = DiscoInfo { node: el.attr("node").map(str::to_owned), ..Default::default() };
        for child in el.children() {
            match child.name() {
                "identity" => {
                    if let Some(identity) = Identity::from_element(child) {
                        info.identities.push(identity);
                    }
                }
                "feature" => {
                    if let Some(var) = child.attr("var") {
                        info.features.push(var.to_owned());
                    }
                }
                _ => {}
            }
        }
        Some(info)
    }

    /// Renders this result as a `<query xmlns='http://jabber.org/protocol/disco#info'/>` element.
    pub fn to_element(&self) -> Element {
        let mut builder = Element::builder("query", NS_DISCO_INFO);
        if let Some(node) = &self.node {
            builder = builder.attr("node", node.clone());
        }
        let mut el = builder.build();
        for identity in &self.identities {
            el.append_child(identity.to_element());
        }
        for feature in &self.features {
            el.append_child(Element::builder("feature", NS_DISCO_INFO).attr("var", feature.clone()).build());
        }
        el
    }
}

/// An `<item/>` of a disco#items result.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// The JID this item points to.
    pub jid: Jid,
    /// A node at that JID, if more specific than the bare entity.
    pub node: Option<String>,
    /// A human-readable name for this item.
    pub name: Option<String>,
}

impl Item {
    fn from_element(el: &Element) -> Option<Item> {
        Some(Item {
            jid: el.attr("jid")?.parse().ok()?,
            node: el.attr("node").map(str::to_owned),
            name: el.attr("name").map(str::to_owned),
        })
    }

    fn to_element(&self) -> Element {
        let mut builder = Element::builder("item", NS_DISCO_ITEMS).attr("jid", self.jid.to_string());
        if let Some(node) = &self.node {
            builder = builder.attr("node", node.clone());
        }
        if let Some(name) = &self.name {
            builder = builder.attr("name", name.clone());
        }
        builder.build()
    }
}

/// A `<query xmlns='http://jabber.org/protocol/disco#items'/>` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoItems {
    /// The node this result is scoped to, if any.
    pub node: Option<String>,
    /// The items listed.
    pub items: Vec<Item>,
}

impl DiscoItems {
    /// Parses a `<query xmlns='http://jabber.org/protocol/disco#items'/>` element.
    pub fn from_element(el: &Element) -> Option<DiscoItems> {
        if !el.is("query", NS_DISCO_ITEMS) {
            return None;
        }
        let items = el.children().filter_map(Item::from_element).collect();
        Some(DiscoItems { node: el.attr("node").map(str::to_owned), items })
    }

    /// Renders this result as a `<query xmlns='http://jabber.org/protocol/disco#items'/>` element.
    pub fn to_element(&self) -> Element {
        let mut builder = Element::builder("query", NS_DISCO_ITEMS);
        if let Some(node) = &self.node {
            builder = builder.attr("node", node.clone());
        }
        let mut el = builder.build();
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
    fn info_roundtrips_identity_and_features() {
        let mut info = DiscoInfo::default();
        info.identities.push(Identity::new("gateway", "icq", "ICQ Gateway"));
        info.features.push(NS_DISCO_INFO.to_string());
        info.features.push(crate::register::NS_REGISTER.to_string());
        let parsed = DiscoInfo::from_element(&info.to_element()).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn items_roundtrip_contact_nodes() {
        let items = DiscoItems {
            node: None,
            items: vec![Item { jid: "123456@gateway".parse().unwrap(), node: None, name: Some("Alice".into()) }],
        };
        let parsed = DiscoItems::from_element(&items.to_element()).unwrap();
        assert_eq!(parsed, items);
    }
}
