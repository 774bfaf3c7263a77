//! Error type for this crate.

use std::error::Error as StdError;
use std::fmt;

/// Errors the gateway's own event loop can surface, as distinct from the
/// per-session errors `icq_client`/`xmpp_core` already classify.
#[derive(Debug)]
pub enum Error {
    /// The component stream failed or was rejected.
    Component(xmpp_core::Error),
    /// An ICQ session failed outside the per-user bridging policy's own
    /// handling (e.g. while still starting up).
    Icq(icq_client::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Component(e) => Some(e),
            Error::Icq(e) => Some(e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Component(e) => write!(f, "component stream error: {e}"),
            Error::Icq(e) => write!(f, "ICQ session error: {e}"),
        }
    }
}

impl From<xmpp_core::Error> for Error {
    fn from(e: xmpp_core::Error) -> Error {
        Error::Component(e)
    }
}

impl From<icq_client::Error> for Error {
    fn from(e: icq_client::Error) -> Error {
        Error::Icq(e)
    }
}

/// This crate's result type.
pub type Result<T> = ::core::result::Result<T, Error>;
