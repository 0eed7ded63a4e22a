//! # infer-core
//!
//! Shared library for Edge-Infer containing the wire protocol codec, tensor
//! descriptors, and the quantization marshalling layer.
//!
//! This crate is used by both the server and client binaries. It has zero
//! dependencies on OS APIs, sockets, or the inference engine itself.
//!
//! # Architecture overview (for beginners)
//!
//! Edge-Infer is an on-device inference server: a client streams raw image
//! data over TCP, the device runs it through a pre-loaded ML model, and the
//! surviving class scores come back together with the measured inference
//! latency.
//!
//! This crate (`infer-core`) is the shared foundation. It defines:
//!
//! - **`protocol`** – How bytes travel over the network. A request is a
//!   single opcode byte followed by the raw sample payload; a response is a
//!   count-prefixed sequence of float32 scores followed by an 8-byte
//!   latency. All multi-byte values are little-endian (the device's native
//!   byte order).
//!
//! - **`tensor`** – Pure numeric logic with no I/O. Tensor descriptors
//!   (element type, count, quantization parameters) and the affine
//!   quantization math that converts between the float samples on the wire
//!   and the engine's native quantized buffers.

// Declare the two top-level modules. Rust will look for each in a
// subdirectory with the same name (e.g., src/protocol/mod.rs).
pub mod protocol;
pub mod tensor;

// Re-export the most-used types at the crate root so callers can write
// `infer_core::Tensor` instead of `infer_core::tensor::Tensor`.
pub use protocol::codec::{
    decode_request, decode_response, encode_request, encode_response, ProtocolError,
};
pub use protocol::frames::{RequestFrame, ResponseFrame, OPCODE_INFER};
pub use tensor::marshal::{dequantize, filter_scores, quantize, MarshalError};
pub use tensor::{ElementType, Quantization, Tensor};
