//! ICQ/OSCAR-to-XMPP gateway: bridges registered users' legacy sessions onto
//! a `jabber:component:accept` stream.
//!
//! [`core::Gateway`] owns the component connection and every running
//! [`icq_client::IcqSession`]; [`config::Config`] and [`store::UserStore`]
//! are supplied by the caller, which owns persistence and process wiring
//! that fall outside this crate's scope.

#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod store;

pub use config::Config;
pub use core::Gateway;
pub use error::{Error, Result};
pub use store::{MemoryUserStore, UserStore};
