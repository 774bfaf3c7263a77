//! A small DOM and an incremental XML event parser built on [`rxml`],
//! covering the subset of XML used by XMPP component streams: elements
//! with a namespace, ordered attributes, and mixed element/text children.
//!
//! This crate deliberately does not attempt to be a general-purpose XML
//! library itself — encoding detection, entity handling and namespace
//! resolution are all delegated to `rxml`. It knows nothing of DTDs or
//! external entities beyond what `rxml` rejects outright.

#![deny(unsafe_code)]

pub mod element;
pub mod error;
pub mod stream;

pub use element::{Element, ElementBuilder, Node};
pub use error::{Error, Result};
pub use stream::{Event, XmlStreamParser};
