//! Error type for this crate.

use core::fmt;
use std::error::Error as StdError;

/// Errors that can surface from the OSCAR client engine. These map onto
/// the error taxonomy this workspace organises around: transport, protocol,
/// authentication, and SSI-level failures each get their own variant so a
/// caller can match without string comparison.
#[derive(Debug)]
pub enum Error {
    /// A TCP/DNS failure or a connect/lookup/idle timeout.
    Transport(String),
    /// A framing or state-machine violation in the OSCAR wire layer.
    Protocol(icq_wire::Error),
    /// `TLV 0x08` was present in the login reply.
    Authentication {
        /// The raw error code TLV payload, if one was present.
        code: Option<Vec<u8>>,
    },
    /// An SSI edit acknowledgement carried a code other than success or
    /// auth-required; the edit is dropped, not fatal.
    Ssi {
        /// The server's modify code.
        code: u16,
    },
    /// A SNAC or TLV chain was missing a field this decoder requires.
    Malformed(String),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(msg) => write!(f, "transport error: {msg}"),
            Error::Protocol(e) => write!(f, "protocol error: {e}"),
            Error::Authentication { code: Some(c) } => {
                write!(f, "authentication failed, error code {c:02x?}")
            }
            Error::Authentication { code: None } => write!(f, "authentication failed"),
            Error::Ssi { code } => write!(f, "SSI edit rejected with code {code:#06x}"),
            Error::Malformed(msg) => write!(f, "malformed message: {msg}"),
        }
    }
}

impl From<icq_wire::Error> for Error {
    fn from(e: icq_wire::Error) -> Error {
        Error::Protocol(e)
    }
}

/// This crate's result type.
pub type Result<T> = ::core::result::Result<T, Error>;
