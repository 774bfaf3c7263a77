//! The `jabber:component:accept` side of the gateway: a component stream
//! implementation, a stanza model built on [`icq_xml::Element`], and the
//! stanza-level and stream-level error types RFC 6120/3920 define.

#![deny(unsafe_code)]

pub mod component;
pub mod error;
pub mod stanza;
pub mod stanza_error;
pub mod stream_error;

pub use component::{ComponentEvent, ComponentStream};
pub use error::{Error, Result};
pub use stanza::{Iq, IqType, Message, MessageType, Presence, PresenceType, Show, Stanza};
pub use stanza_error::{DefinedCondition, ErrorType, StanzaError};
pub use stream_error::{StreamError, StreamErrorCondition};
