//! Error type for this crate.

use core::fmt;
use std::error::Error as StdError;

/// Our main error type.
#[derive(Debug)]
pub enum Error {
    /// The underlying byte stream failed, or could not be opened.
    Transport(String),
    /// The XML event stream reported malformed input.
    Xml(icq_xml::Error),
    /// The peer's handshake reply was not an empty `<handshake/>`.
    HandshakeFailed,
    /// The stream ended before the operation in progress completed.
    Disconnected,
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(msg) => write!(f, "transport error: {msg}"),
            Error::Xml(e) => write!(f, "XML stream error: {e}"),
            Error::HandshakeFailed => write!(f, "component handshake rejected"),
            Error::Disconnected => write!(f, "stream disconnected"),
        }
    }
}

impl From<icq_xml::Error> for Error {
    fn from(e: icq_xml::Error) -> Error {
        Error::Xml(e)
    }
}

/// Our simplified Result type.
pub type Result<T> = ::core::result::Result<T, Error>;
