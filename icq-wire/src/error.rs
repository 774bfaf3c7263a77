//! Error type for this crate.

use core::fmt;
use std::error::Error as StdError;

/// Errors produced while decoding OSCAR wire structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read ran past the end of the buffer.
    UnexpectedEnd {
        /// How many bytes were requested.
        requested: usize,
        /// How many bytes were actually available.
        available: usize,
    },
    /// A FLAP header did not start with the `0x2A` marker byte.
    BadFlapMarker(u8),
    /// A GUID string was not 32 hex digits (dashes aside).
    BadGuidString(String),
    /// A SNAC was built from a FLAP frame on a channel that never carries
    /// SNAC payloads (e.g. the keepalive channel).
    NotASnacChannel(u8),
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnexpectedEnd { requested, available } => write!(
                f,
                "tried to read {requested} bytes but only {available} were available"
            ),
            Error::BadFlapMarker(b) => write!(f, "expected FLAP marker 0x2A, found {b:#04x}"),
            Error::BadGuidString(s) => write!(f, "not a valid GUID string: {s:?}"),
            Error::NotASnacChannel(c) => write!(f, "FLAP channel {c} does not carry SNAC data"),
        }
    }
}

/// This crate's result type.
pub type Result<T> = ::core::result::Result<T, Error>;
