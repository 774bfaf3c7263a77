//! Stanza extensions the gateway speaks on top of the bare component stream
//! and stanza model in `xmpp-core`: in-band registration, vCard-temp, data
//! forms, roster item exchange, ad-hoc commands, service discovery,
//! nickname, and legacy delayed delivery.

#![deny(unsafe_code)]

pub mod commands;
pub mod data_forms;
pub mod delay;
pub mod disco;
pub mod nick;
pub mod register;
pub mod rosterx;
pub mod vcard;

pub use commands::{Command, CommandAction, CommandStatus, NS_COMMANDS};
pub use data_forms::{DataForm, Field, FormType, NS_DATA_FORMS};
pub use delay::{Delay, NS_DELAY};
pub use disco::{DiscoInfo, DiscoItems, Identity, Item as DiscoItem, NS_DISCO_INFO, NS_DISCO_ITEMS};
pub use nick::{Nick, NS_NICK};
pub use register::{RegisterQuery, NS_REGISTER};
pub use rosterx::{ExchangeAction, ExchangeItem, RosterExchange, NS_ROSTERX};
pub use vcard::{VCard, NS_VCARD};
