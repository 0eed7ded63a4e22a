//! Response construction: dequantizes the engine's raw output, applies
//! the significance filter, and sends the encoded frame.
//!
//! [`collect_scores`] must run while the engine lock is held: it reads
//! the shared output tensor. It returns an owned score vector precisely
//! so [`send_response`] can then run *outside* the lock: a peer on a
//! congested link should stall only its own connection, never the
//! engine.

use infer_core::{dequantize, encode_response, filter_scores, ResponseFrame, Tensor};
use tokio::io::AsyncWrite;

use crate::engine::EngineError;
use crate::infrastructure::net::write_all_bytes;

use super::PipelineError;

/// Reads the output tensor and produces the filtered score vector.
///
/// # Errors
///
/// Returns [`EngineError::CorruptModel`] (process-fatal) if the model
/// declares affine quantization with a zero scale.
pub fn collect_scores(output: &Tensor, threshold: f32) -> Result<Vec<f32>, PipelineError> {
    let raw = dequantize(output).map_err(EngineError::CorruptModel)?;
    Ok(filter_scores(&raw, threshold))
}

/// Encodes and sends one response frame.
///
/// # Errors
///
/// Any write failure is fatal to the connection; the frame is discarded,
/// never resumed.
pub async fn send_response<S>(
    stream: &mut S,
    scores: Vec<f32>,
    inference_time_us: i64,
) -> Result<(), PipelineError>
where
    S: AsyncWrite + Unpin,
{
    let frame = ResponseFrame {
        scores,
        inference_time_us,
    };
    write_all_bytes(stream, &encode_response(&frame)).await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use infer_core::{decode_response, ElementType, Quantization};

    fn float_output(values: &[f32]) -> Tensor {
        let mut t = Tensor::new(ElementType::Float32, values.len(), Quantization::None);
        for (chunk, v) in t.bytes_mut().chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        t
    }

    #[test]
    fn test_collect_scores_filters_below_threshold() {
        let output = float_output(&[0.9, -0.5, 0.3]);
        let scores = collect_scores(&output, 0.0).unwrap();
        assert_eq!(scores, vec![0.9, 0.3]);
    }

    #[test]
    fn test_collect_scores_zero_scale_is_process_fatal() {
        let output = Tensor::new(
            ElementType::Int8,
            4,
            Quantization::Affine {
                scale: 0.0,
                zero_point: 0,
            },
        );
        let err = collect_scores(&output, 0.0).unwrap_err();
        assert!(err.is_fatal_to_process());
    }

    #[tokio::test]
    async fn test_send_response_writes_decodable_frame() {
        let mut buf = Vec::new();
        send_response(&mut buf, vec![0.25, 0.75], 1_234)
            .await
            .expect("write to Vec cannot fail");

        let (frame, consumed) = decode_response(&buf).expect("frame must decode");
        assert_eq!(consumed, buf.len());
        assert_eq!(frame.scores, vec![0.25, 0.75]);
        assert_eq!(frame.inference_time_us, 1_234);
    }

    #[tokio::test]
    async fn test_send_response_write_failure_is_io_error() {
        let mut transport = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer gone",
            ))
            .build();

        let err = send_response(&mut transport, vec![1.0], 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
