//! Quantization marshalling: converts between the float32 samples carried
//! on the wire and the engine's native tensor representations.
//!
//! # Affine quantization (for beginners)
//!
//! Quantized models store activations as small integers instead of floats
//! to save memory and compute. The mapping is affine:
//!
//! ```text
//! integer = round(real / scale) + zero_point
//! real    = (integer - zero_point) * scale
//! ```
//!
//! `scale` and `zero_point` come from the model's own metadata, so a zero
//! scale is not a bad request; it means the loaded model itself is
//! invalid, and no request against it can ever succeed.

use tracing::error;

use super::{ElementType, Quantization, Tensor};

/// Errors produced by the marshalling layer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarshalError {
    /// The model declares affine quantization but its scale is zero.
    /// This is corrupt model metadata, fatal to the whole server process.
    #[error("corrupt quantization metadata: declared affine quantization with scale 0")]
    CorruptQuantization,
}

// ── Quantize (wire → tensor) ──────────────────────────────────────────────────

/// Quantizes one float sample to a signed 8-bit value.
///
/// Uses round-to-nearest and saturates at the i8 range limits, so an
/// out-of-range sample clamps instead of wrapping.
pub fn quantize(value: f32, scale: f32, zero_point: i32) -> i8 {
    let q = (value / scale).round() as i64 + zero_point as i64;
    q.clamp(i8::MIN as i64, i8::MAX as i64) as i8
}

// ── Dequantize (tensor → scores) ──────────────────────────────────────────────

/// Reads the raw output tensor and produces one f32 score per element.
///
/// Behavior per declared element type:
///
/// - `Float32` – passthrough copy.
/// - `UInt8` / `Int8` / `Int16` – numeric cast when no quantization
///   parameters are declared, otherwise `(raw - zero_point) * scale`.
/// - `Int32` – numeric cast.
/// - `Bool` – `1.0` for a nonzero byte, `0.0` otherwise.
///
/// # Errors
///
/// Returns [`MarshalError::CorruptQuantization`] when affine quantization
/// is declared with a zero scale. The caller must treat this as fatal to
/// the process, not to the request: the model metadata itself is broken.
pub fn dequantize(tensor: &Tensor) -> Result<Vec<f32>, MarshalError> {
    let (scale, zero_point) = match tensor.quantization() {
        Quantization::Affine { scale, zero_point } => {
            if scale == 0.0 {
                error!("scale is zero, invalid quantization parameters");
                return Err(MarshalError::CorruptQuantization);
            }
            (scale, zero_point)
        }
        Quantization::None => (0.0, 0),
    };
    let quantized = tensor.quantization().is_affine();

    let count = tensor.element_count();
    let bytes = tensor.bytes();
    let mut scores = Vec::with_capacity(count);

    match tensor.element_type() {
        ElementType::Float32 => {
            for chunk in bytes.chunks_exact(4) {
                scores.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        ElementType::UInt8 => {
            for &b in bytes {
                scores.push(dequantize_int(b as i32, quantized, scale, zero_point));
            }
        }
        ElementType::Int8 => {
            for &b in bytes {
                scores.push(dequantize_int(b as i8 as i32, quantized, scale, zero_point));
            }
        }
        ElementType::Int16 => {
            for chunk in bytes.chunks_exact(2) {
                let raw = i16::from_le_bytes([chunk[0], chunk[1]]) as i32;
                scores.push(dequantize_int(raw, quantized, scale, zero_point));
            }
        }
        ElementType::Int32 => {
            for chunk in bytes.chunks_exact(4) {
                scores.push(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f32);
            }
        }
        ElementType::Bool => {
            for &b in bytes {
                scores.push(if b != 0 { 1.0 } else { 0.0 });
            }
        }
    }

    Ok(scores)
}

/// Applies the affine mapping to one raw integer value, or casts it when
/// the tensor is unquantized.
fn dequantize_int(raw: i32, quantized: bool, scale: f32, zero_point: i32) -> f32 {
    if quantized {
        (raw - zero_point) as f32 * scale
    } else {
        raw as f32
    }
}

// ── Significance filter ───────────────────────────────────────────────────────

/// Returns the order-preserving subsequence of `scores` that are
/// `>= threshold`.
///
/// A threshold of `0.0` (the production default) admits every non-negative
/// score. NaN scores never pass the filter: a NaN compares false against
/// every threshold.
///
/// # Examples
///
/// ```rust
/// use infer_core::filter_scores;
///
/// assert_eq!(filter_scores(&[0.9, -0.2, 0.4], 0.0), vec![0.9, 0.4]);
/// ```
pub fn filter_scores(scores: &[f32], threshold: f32) -> Vec<f32> {
    scores.iter().copied().filter(|&s| s >= threshold).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
