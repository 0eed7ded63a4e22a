//! Binary codec for encoding and decoding Edge-Infer protocol frames.
//!
//! Wire format:
//! ```text
//! Request:  [opcode:1][payload:N]
//! Response: [score_count:4][scores:count*4][inference_time_us:8]
//! ```
//! All multi-byte values are little-endian, the device's native byte
//! order. The request payload length `N` is fixed by the model's input
//! tensor (see [`crate::protocol::frames::RequestFrame`]).

use thiserror::Error;

use crate::protocol::frames::{
    RequestFrame, ResponseFrame, INFERENCE_TIME_SIZE, OPCODE_INFER, OPCODE_SIZE, SCORE_COUNT_SIZE,
};

/// Errors that can occur while parsing protocol frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the frame requires.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The request opcode is not [`OPCODE_INFER`].
    #[error("invalid request opcode: 0x{0:02X}")]
    BadOpcode(u8),

    /// The input tensor's element type has no defined wire representation.
    #[error("unsupported input element type: {0}")]
    UnsupportedElementType(crate::tensor::ElementType),
}

// ── Request codec ─────────────────────────────────────────────────────────────

/// Encodes a request frame: the inference opcode followed by the raw
/// payload bytes.
pub fn encode_request(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(OPCODE_SIZE + payload.len());
    buf.push(OPCODE_INFER);
    buf.extend_from_slice(payload);
    buf
}

/// Decodes one request frame from `bytes`, given the payload length the
/// model expects.
///
/// Returns the frame and the total number of bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError::BadOpcode`] for any opcode other than
/// [`OPCODE_INFER`], or [`ProtocolError::InsufficientData`] when the
/// payload is incomplete.
pub fn decode_request(
    bytes: &[u8],
    expected_payload_len: usize,
) -> Result<(RequestFrame, usize), ProtocolError> {
    let total = OPCODE_SIZE + expected_payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }
    let opcode = bytes[0];
    if opcode != OPCODE_INFER {
        return Err(ProtocolError::BadOpcode(opcode));
    }
    Ok((
        RequestFrame {
            opcode,
            payload: bytes[OPCODE_SIZE..total].to_vec(),
        },
        total,
    ))
}

// ── Response codec ────────────────────────────────────────────────────────────

/// Encodes a response frame: count-prefixed little-endian f32 scores
/// followed by the 8-byte signed latency.
pub fn encode_response(frame: &ResponseFrame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame.encoded_len());
    buf.extend_from_slice(&(frame.scores.len() as u32).to_le_bytes());
    for score in &frame.scores {
        buf.extend_from_slice(&score.to_le_bytes());
    }
    buf.extend_from_slice(&frame.inference_time_us.to_le_bytes());
    buf
}

/// Decodes one response frame from the beginning of `bytes`.
///
/// Returns the decoded frame and the total number of bytes consumed, so a
/// streaming caller can advance its read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] if the buffer does not yet
/// hold a complete frame.
///
/// # Examples
///
/// ```rust
/// use infer_core::{decode_response, encode_response, ResponseFrame};
///
/// let frame = ResponseFrame {
///     scores: vec![0.9, 0.1],
///     inference_time_us: 1500,
/// };
/// let bytes = encode_response(&frame);
/// let (decoded, consumed) = decode_response(&bytes).unwrap();
/// assert_eq!(decoded, frame);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn decode_response(bytes: &[u8]) -> Result<(ResponseFrame, usize), ProtocolError> {
    if bytes.len() < SCORE_COUNT_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: SCORE_COUNT_SIZE,
            available: bytes.len(),
        });
    }
    let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;

    let total = SCORE_COUNT_SIZE + count * 4 + INFERENCE_TIME_SIZE;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    let mut scores = Vec::with_capacity(count);
    let mut off = SCORE_COUNT_SIZE;
    for _ in 0..count {
        scores.push(f32::from_le_bytes([
            bytes[off],
            bytes[off + 1],
            bytes[off + 2],
            bytes[off + 3],
        ]));
        off += 4;
    }

    let inference_time_us = i64::from_le_bytes([
        bytes[off],
        bytes[off + 1],
        bytes[off + 2],
        bytes[off + 3],
        bytes[off + 4],
        bytes[off + 5],
        bytes[off + 6],
        bytes[off + 7],
    ]);

    Ok((
        ResponseFrame {
            scores,
            inference_time_us,
        },
        total,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
