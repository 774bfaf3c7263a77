//! Jabber-Id (JID) parsing and construction.
//!
//! This crate intentionally does not perform stringprep/IDN normalisation:
//! the gateway core treats that as an externally injected concern (see
//! [`Normalizer`]) rather than baking a particular profile into every JID
//! comparison.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// An error that signifies that a `Jid` cannot be parsed from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JidParseError {
    /// Happens when there is no domain, that is either the string is empty,
    /// starts with a /, or contains the @/ sequence.
    NoDomain,
    /// Happens when there is no resource, that is string contains no /.
    NoResource,
    /// Happens when the node is empty, that is the string starts with a @.
    EmptyNode,
    /// Happens when the resource is empty, that is the string ends with a /.
    EmptyResource,
}

impl fmt::Display for JidParseError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            JidParseError::NoDomain => "no domain found in this JID",
            JidParseError::NoResource => "no resource found in this full JID",
            JidParseError::EmptyNode => "nodepart empty despite the presence of a @",
            JidParseError::EmptyResource => "resource empty despite the presence of a /",
        };
        fmt.write_str(s)
    }
}

impl std::error::Error for JidParseError {}

/// A trait for pluggable JID normalisation (stringprep/IDN or similar). The
/// gateway core is deliberately unaware of which profile is in effect; it
/// only ever compares JIDs through whatever [`Normalizer`] it was handed.
pub trait Normalizer {
    /// Returns a normalised copy of `input`, or the input unchanged if no
    /// normalisation is necessary/available.
    fn normalize(&self, input: &str) -> String;
}

/// A normaliser that performs no normalisation at all; the default when
/// none is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityNormalizer;

impl Normalizer for IdentityNormalizer {
    fn normalize(&self, input: &str) -> String {
        input.to_owned()
    }
}

/// An enum representing a Jabber ID. It can be either a [`BareJid`] or a
/// [`FullJid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Jid {
    /// Bare Jid, `node@domain` or `domain`.
    Bare(BareJid),
    /// Full Jid, `node@domain/resource`.
    Full(FullJid),
}

impl Jid {
    /// The bare part of this JID, dropping any resource.
    pub fn to_bare(&self) -> BareJid {
        match self {
            Jid::Bare(b) => b.clone(),
            Jid::Full(f) => f.clone().into(),
        }
    }

    /// The resource of this JID, if it is a full JID.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Jid::Bare(_) => None,
            Jid::Full(f) => Some(&f.resource),
        }
    }

    /// The node part, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            Jid::Bare(b) => b.node.as_deref(),
            Jid::Full(f) => f.node.as_deref(),
        }
    }

    /// The domain part.
    pub fn domain(&self) -> &str {
        match self {
            Jid::Bare(b) => &b.domain,
            Jid::Full(f) => &f.domain,
        }
    }
}

impl FromStr for Jid {
    type Err = JidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node, domain, resource) = split_jid(s)?;
        Ok(match resource {
            Some(resource) => Jid::Full(FullJid {
                node,
                domain,
                resource,
            }),
            None => Jid::Bare(BareJid { node, domain }),
        })
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> String {
        match jid {
            Jid::Bare(bare) => String::from(bare),
            Jid::Full(full) => String::from(full),
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Jid::Bare(b) => write!(fmt, "{}", b),
            Jid::Full(f) => write!(fmt, "{}", f),
        }
    }
}

/// A struct representing a Full Jabber ID: `node@domain/resource`, where
/// `node` is optional.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FullJid {
    /// The node part of the Jabber ID, if it exists.
    pub node: Option<String>,
    /// The domain of the Jabber ID.
    pub domain: String,
    /// The resource of the Jabber ID.
    pub resource: String,
}

/// A struct representing a Bare Jabber ID: `node@domain`, where `node` is
/// optional.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BareJid {
    /// The node part of the Jabber ID, if it exists.
    pub node: Option<String>,
    /// The domain of the Jabber ID.
    pub domain: String,
}

impl From<FullJid> for String {
    fn from(jid: FullJid) -> String {
        let mut string = String::new();
        if let Some(ref node) = jid.node {
            string.push_str(node);
            string.push('@');
        }
        string.push_str(&jid.domain);
        string.push('/');
        string.push_str(&jid.resource);
        string
    }
}

impl From<BareJid> for String {
    fn from(jid: BareJid) -> String {
        let mut string = String::new();
        if let Some(ref node) = jid.node {
            string.push_str(node);
            string.push('@');
        }
        string.push_str(&jid.domain);
        string
    }
}

impl From<FullJid> for BareJid {
    fn from(full: FullJid) -> BareJid {
        BareJid {
            node: full.node,
            domain: full.domain,
        }
    }
}

impl fmt::Debug for FullJid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "FullJid({})", self)
    }
}

impl fmt::Debug for BareJid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "BareJid({})", self)
    }
}

impl fmt::Display for FullJid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(String::from(self.clone()).as_ref())
    }
}

impl fmt::Display for BareJid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(String::from(self.clone()).as_ref())
    }
}

enum ParserState {
    Node,
    Domain,
    Resource,
}

type SplitJid = (Option<String>, String, Option<String>);

fn split_jid(s: &str) -> Result<SplitJid, JidParseError> {
    let mut buf = String::with_capacity(s.len());
    let mut state = ParserState::Node;
    let mut node = None;
    let mut domain = None;
    let mut resource = None;
    for c in s.chars() {
        match state {
            ParserState::Node => match c {
                '@' => {
                    if buf.is_empty() {
                        return Err(JidParseError::EmptyNode);
                    }
                    state = ParserState::Domain;
                    node = Some(std::mem::take(&mut buf));
                }
                '/' => {
                    if buf.is_empty() {
                        return Err(JidParseError::NoDomain);
                    }
                    state = ParserState::Resource;
                    domain = Some(std::mem::take(&mut buf));
                }
                c => buf.push(c),
            },
            ParserState::Domain => match c {
                '/' => {
                    if buf.is_empty() {
                        return Err(JidParseError::NoDomain);
                    }
                    state = ParserState::Resource;
                    domain = Some(std::mem::take(&mut buf));
                }
                c => buf.push(c),
            },
            ParserState::Resource => buf.push(c),
        }
    }
    if !buf.is_empty() {
        match state {
            ParserState::Node | ParserState::Domain => domain = Some(buf),
            ParserState::Resource => resource = Some(buf),
        }
    } else if matches!(state, ParserState::Resource) {
        return Err(JidParseError::EmptyResource);
    }
    Ok((node, domain.ok_or(JidParseError::NoDomain)?, resource))
}

impl FromStr for FullJid {
    type Err = JidParseError;

    fn from_str(s: &str) -> Result<FullJid, JidParseError> {
        let (node, domain, resource) = split_jid(s)?;
        Ok(FullJid {
            node,
            domain,
            resource: resource.ok_or(JidParseError::NoResource)?,
        })
    }
}

impl FullJid {
    /// Constructs a Full Jabber ID containing all three components.
    pub fn new<NS, DS, RS>(node: NS, domain: DS, resource: RS) -> FullJid
    where
        NS: Into<String>,
        DS: Into<String>,
        RS: Into<String>,
    {
        FullJid {
            node: Some(node.into()),
            domain: domain.into(),
            resource: resource.into(),
        }
    }

    /// Constructs a new Jabber ID from an existing one, with the resource
    /// swapped out.
    pub fn with_resource<RS>(&self, resource: RS) -> FullJid
    where
        RS: Into<String>,
    {
        FullJid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: resource.into(),
        }
    }
}

impl FromStr for BareJid {
    type Err = JidParseError;

    fn from_str(s: &str) -> Result<BareJid, JidParseError> {
        let (node, domain, _resource) = split_jid(s)?;
        Ok(BareJid { node, domain })
    }
}

impl BareJid {
    /// Constructs a Bare Jabber ID containing two components.
    pub fn new<NS, DS>(node: NS, domain: DS) -> BareJid
    where
        NS: Into<String>,
        DS: Into<String>,
    {
        BareJid {
            node: Some(node.into()),
            domain: domain.into(),
        }
    }

    /// Constructs a Bare Jabber ID containing only a domain.
    pub fn domain<DS>(domain: DS) -> BareJid
    where
        DS: Into<String>,
    {
        BareJid {
            node: None,
            domain: domain.into(),
        }
    }

    /// Constructs a Full Jabber ID from this Bare Jabber ID, by specifying a
    /// `resource`.
    pub fn with_resource<RS>(&self, resource: RS) -> FullJid
    where
        RS: Into<String>,
    {
        FullJid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_full_jids() {
        assert_eq!(
            FullJid::from_str("a@b.c/d"),
            Ok(FullJid::new("a", "b.c", "d"))
        );
        assert_eq!(FullJid::from_str("a@b.c"), Err(JidParseError::NoResource));
    }

    #[test]
    fn can_parse_bare_jids() {
        assert_eq!(BareJid::from_str("a@b.c/d"), Ok(BareJid::new("a", "b.c")));
        assert_eq!(BareJid::from_str("a@b.c"), Ok(BareJid::new("a", "b.c")));
    }

    #[test]
    fn full_to_bare_jid() {
        let bare: BareJid = FullJid::new("a", "b.c", "d").into();
        assert_eq!(bare, BareJid::new("a", "b.c"));
    }

    #[test]
    fn bare_to_full_jid() {
        assert_eq!(
            BareJid::new("a", "b.c").with_resource("d"),
            FullJid::new("a", "b.c", "d")
        );
    }

    #[test]
    fn serialise() {
        assert_eq!(
            String::from(FullJid::new("a", "b", "c")),
            String::from("a@b/c")
        );
        assert_eq!(String::from(BareJid::new("a", "b")), String::from("a@b"));
    }

    #[test]
    fn invalid_jids() {
        assert_eq!(BareJid::from_str(""), Err(JidParseError::NoDomain));
        assert_eq!(BareJid::from_str("@b"), Err(JidParseError::EmptyNode));
        assert_eq!(BareJid::from_str("b/"), Err(JidParseError::EmptyResource));
    }

    #[test]
    fn identity_normalizer_is_a_no_op() {
        let n = IdentityNormalizer;
        assert_eq!(n.normalize("UPPER@Domain"), "UPPER@Domain");
    }

    #[test]
    fn jid_enum_helpers() {
        let full = Jid::from_str("a@b/c").unwrap();
        assert_eq!(full.to_bare(), BareJid::new("a", "b"));
        assert_eq!(full.resource(), Some("c"));

        let bare = Jid::from_str("a@b").unwrap();
        assert_eq!(bare.resource(), None);
    }
}

// Derive impls requiring the `memchr`/`serde` features below are kept
// deliberately separate from the struct bodies above, mirroring how this
// workspace layers optional functionality onto otherwise plain data types.
#[cfg(feature = "serde")]
mod serde_impls {
    use super::{BareJid, FullJid, Jid};
    use serde::de::{self, Deserialize, Deserializer, Visitor};
    use serde::ser::{Serialize, Serializer};
    use std::fmt;
    use std::marker::PhantomData;
    use std::str::FromStr;

    macro_rules! string_serde {
        ($t:ty, $visitor:ident, $expecting:literal) => {
            impl Serialize for $t {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(&self.to_string())
                }
            }

            struct $visitor(PhantomData<$t>);

            impl<'de> Visitor<'de> for $visitor {
                type Value = $t;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str($expecting)
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                    <$t>::from_str(v).map_err(de::Error::custom)
                }
            }

            impl<'de> Deserialize<'de> for $t {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    deserializer.deserialize_str($visitor(PhantomData))
                }
            }
        };
    }

    string_serde!(Jid, JidVisitor, "a Jabber ID string");
    string_serde!(BareJid, BareJidVisitor, "a bare Jabber ID string");
    string_serde!(FullJid, FullJidVisitor, "a full Jabber ID string");
}
