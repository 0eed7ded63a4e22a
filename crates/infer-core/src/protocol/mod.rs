//! Protocol module containing frame types and the binary codec.

pub mod codec;
pub mod frames;

pub use codec::{decode_request, decode_response, encode_request, encode_response, ProtocolError};
pub use frames::*;
