//! Request ingest: parses one request frame off the wire and marshals
//! its payload into the engine's input tensor.
//!
//! Ingest is split in two so the worker can sequence it around the
//! engine lock:
//!
//! 1. [`read_request_opcode`]: validates the opcode. Runs *before* the
//!    engine is locked, so an idle connection that never sends another
//!    request does not hold the engine hostage while it waits.
//! 2. [`ingest_payload`]: reads the sample payload straight into the
//!    engine's input tensor. Must run with the engine lock held, since
//!    it writes shared tensor memory.
//!
//! The payload length is not on the wire; it is fixed by the model. On
//! the direct float path it is the input tensor's byte length. On the
//! quantizing path the client always sends float32 samples, four bytes
//! per element, which the server quantizes into the tensor's int8
//! buffer using the model's affine parameters.

use infer_core::{quantize, ElementType, ProtocolError, Quantization, Tensor, OPCODE_INFER};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

use crate::infrastructure::net::read_exact_into;

use super::PipelineError;

/// Awaits the next request's opcode byte and validates it.
///
/// # Errors
///
/// - [`PipelineError::Disconnected`] if the peer closed the connection
///   cleanly before sending another request.
/// - [`ProtocolError::BadOpcode`] for any opcode other than
///   [`OPCODE_INFER`].
/// - [`PipelineError::Io`] on transport failure.
pub async fn read_request_opcode<S>(stream: &mut S) -> Result<u8, PipelineError>
where
    S: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    match stream.read(&mut byte).await {
        Ok(0) => Err(PipelineError::Disconnected),
        Ok(_) => {
            if byte[0] != OPCODE_INFER {
                warn!("invalid request opcode: 0x{:02X}", byte[0]);
                return Err(ProtocolError::BadOpcode(byte[0]).into());
            }
            Ok(byte[0])
        }
        Err(e) => Err(e.into()),
    }
}

/// Reads the request payload into the engine's input tensor.
///
/// Writes only into the pre-allocated tensor buffer; tensor memory is
/// never allocated here. A transport failure mid-payload discards the
/// frame; the partially filled tensor is never handed to the engine,
/// because the error propagates before the worker reaches `invoke`.
///
/// # Errors
///
/// - [`ProtocolError::UnsupportedElementType`] if the input tensor's
///   type has no wire representation (fatal to the connection).
/// - [`PipelineError::Io`] on short or failed reads.
pub async fn ingest_payload<S>(stream: &mut S, input: &mut Tensor) -> Result<(), PipelineError>
where
    S: AsyncRead + Unpin,
{
    match input.element_type() {
        ElementType::Float32 => {
            // Direct path: the wire bytes are the tensor bytes.
            read_exact_into(stream, input.bytes_mut()).await?;
        }
        ElementType::Int8 => {
            // Quantizing path: float32 samples on the wire, int8 in the
            // tensor.
            let mut payload = vec![0u8; input.element_count() * 4];
            read_exact_into(stream, &mut payload).await?;

            let (scale, zero_point) = match input.quantization() {
                Quantization::Affine { scale, zero_point } => (scale, zero_point),
                // An unquantized int8 input takes the identity mapping.
                Quantization::None => (1.0, 0),
            };

            let buf = input.bytes_mut();
            for (i, chunk) in payload.chunks_exact(4).enumerate() {
                let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                buf[i] = quantize(sample, scale, zero_point) as u8;
            }
        }
        other => {
            return Err(ProtocolError::UnsupportedElementType(other).into());
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
