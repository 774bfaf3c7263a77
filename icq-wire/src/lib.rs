//! OSCAR wire types shared between the client session and the gateway:
//! a cursor-based byte buffer, TLVs and TLV chains, FLAP framing, SNAC
//! command headers, and capability GUIDs.

pub mod buffer;
pub mod error;
pub mod flap;
pub mod guid;
pub mod snac;
pub mod tlv;
pub mod tlv_chain;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use flap::{Channel, FlapBuffer, FLAP_HEADER_SIZE, FLAP_MARKER};
pub use guid::Guid;
pub use snac::{SnacBuffer, SNAC_HEADER_SIZE};
pub use tlv::Tlv;
pub use tlv_chain::TlvChain;
