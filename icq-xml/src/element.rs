//! A small DOM implementation, targeting the subset of XML useful for XMPP:
//! elements with a namespace, attributes, and a mix of child elements and
//! text nodes.

use std::fmt::Write as _;

/// A node inside an [`Element`]: either a nested element or a run of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A child element.
    Element(Element),
    /// A text node.
    Text(String),
}

/// An XML element: a local name, a namespace, an ordered set of attributes,
/// and ordered children (mixed elements and text).
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    namespace: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates a bare element with no attributes or children.
    pub fn bare<S: Into<String>, NS: Into<String>>(name: S, namespace: NS) -> Element {
        Element {
            name: name.into(),
            namespace: namespace.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Starts building an element through an [`ElementBuilder`].
    pub fn builder<S: Into<String>, NS: Into<String>>(name: S, namespace: NS) -> ElementBuilder {
        ElementBuilder {
            element: Element::bare(name, namespace),
        }
    }

    /// The element's local name, without namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element's namespace.
    pub fn ns(&self) -> &str {
        &self.namespace
    }

    /// Returns true if this element's name and namespace match.
    pub fn is(&self, name: &str, namespace: &str) -> bool {
        self.name == name && self.namespace == namespace
    }

    /// Returns the value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attr<S: Into<String>, V: Into<String>>(&mut self, name: S, value: V) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Removes an attribute, returning its former value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    /// Iterates over this element's attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Appends a child node.
    pub fn append_node(&mut self, node: Node) -> &mut Element {
        self.children.push(node);
        self
    }

    /// Appends a child element.
    pub fn append_child(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    pub fn append_text_node<S: Into<String>>(&mut self, text: S) -> &mut Element {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Iterates over this element's direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Returns the first child element matching `name`/`namespace`.
    pub fn get_child(&self, name: &str, namespace: &str) -> Option<&Element> {
        self.children().find(|c| c.is(name, namespace))
    }

    /// Replaces the first matching child (or appends if none matches) with
    /// `child` — used by stanza wrappers that carry "exactly one payload
    /// child" semantics (see [`crate::Element::set_only_child`]).
    pub fn set_only_child(&mut self, child: Element) {
        self.children.retain(|n| !matches!(n, Node::Element(_)));
        self.children.push(Node::Element(child));
    }

    /// The concatenation of all direct text node children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for n in &self.children {
            if let Node::Text(t) = n {
                out.push_str(t);
            }
        }
        out
    }

    /// Renders this element (and its subtree) as XML text.
    pub fn write_to(&self, out: &mut String) {
        write!(out, "<{}", self.name).ok();
        if !self.namespace.is_empty() {
            write!(out, " xmlns='{}'", escape_attr(&self.namespace)).ok();
        }
        for (k, v) in &self.attributes {
            write!(out, " {}='{}'", k, escape_attr(v)).ok();
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => out.push_str(&escape_text(t)),
            }
        }
        write!(out, "</{}>", self.name).ok();
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut s = String::new();
        self.write_to(&mut s);
        f.write_str(&s)
    }
}

/// A builder for [`Element`]s, mirroring the fluent style used throughout
/// this workspace's stanza constructors.
pub struct ElementBuilder {
    element: Element,
}

impl ElementBuilder {
    /// Sets an attribute and returns self.
    pub fn attr<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.element.set_attr(name, value);
        self
    }

    /// Appends a child element and returns self.
    pub fn append(mut self, child: Element) -> Self {
        self.element.append_child(child);
        self
    }

    /// Appends a text node and returns self.
    pub fn append_text<S: Into<String>>(mut self, text: S) -> Self {
        self.element.append_text_node(text);
        self
    }

    /// Finishes building, yielding the constructed [`Element`].
    pub fn build(self) -> Element {
        self.element
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\'', "&apos;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_roundtrip() {
        let el = Element::builder("iq", "jabber:component:accept")
            .attr("type", "get")
            .attr("id", "1")
            .append(Element::bare("query", "jabber:iq:register"))
            .build();
        let s = el.to_string();
        assert!(s.starts_with("<iq"));
        assert!(s.contains("type='get'"));
        assert!(s.contains("<query xmlns='jabber:iq:register'/>"));
    }

    #[test]
    fn text_escaping() {
        let mut el = Element::bare("body", "jabber:client");
        el.append_text_node("a < b & c");
        assert_eq!(el.to_string(), "<body xmlns='jabber:client'>a &lt; b &amp; c</body>");
    }

    #[test]
    fn set_only_child_replaces() {
        let mut iq = Element::bare("iq", "jabber:component:accept");
        iq.set_only_child(Element::bare("query", "ns:a"));
        iq.set_only_child(Element::bare("vCard", "vcard-temp"));
        assert_eq!(iq.children().count(), 1);
        assert!(iq.get_child("vCard", "vcard-temp").is_some());
    }
}
