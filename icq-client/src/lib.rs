//! OSCAR/ICQ client protocol engine.
//!
//! This crate speaks the client side of the OSCAR wire protocol well
//! enough to authenticate, maintain a server-side contact list, exchange
//! instant messages, and look up buddy presence and profile details. It
//! builds on [`icq_wire`] for framing and leaves the transport (a TCP
//! socket, a timer wheel, reconnect policy) to its caller via
//! [`session::IcqSession`].

#![deny(unsafe_code)]

pub mod capability;
pub mod connector;
pub mod contact;
pub mod error;
pub mod login;
pub mod message;
pub mod meta_info;
pub mod rate;
pub mod session;
pub mod socket;
pub mod ssi;
pub mod user_info;

pub use error::{Error, Result};
pub use message::Message;
pub use session::{IcqSession, SessionEvent, SessionState};
