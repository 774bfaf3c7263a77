//! Error type for this crate.

use std::error::Error as StdError;
use std::fmt;

/// Our main error type.
#[derive(Debug)]
pub enum Error {
    /// The underlying parser rejected the input: mismatched tags, a bad
    /// entity, an unsupported or inconsistent encoding declaration, an
    /// unterminated construct, or any other well-formedness violation.
    Xml(rxml::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Xml(e) => Some(e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Xml(e) => write!(fmt, "XML error: {}", e),
        }
    }
}

impl From<rxml::Error> for Error {
    fn from(err: rxml::Error) -> Error {
        Error::Xml(err)
    }
}

/// Our simplified Result type.
pub type Result<T> = ::core::result::Result<T, Error>;
