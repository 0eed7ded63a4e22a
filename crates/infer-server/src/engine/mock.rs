//! Mock inference engine for tests and bring-up.
//!
//! Stands in for the FFI-backed production runtime. The mock "model"
//! echoes its input: output element `i` is input sample `i` (dequantized
//! if the input is quantized), or `0.0` past the end of the input. That
//! makes every response predictable from the request, which is exactly
//! what the protocol tests need, including the cross-connection
//! isolation tests, where each client can recognise its own data.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use infer_core::{dequantize, quantize, ElementType, Quantization, Tensor};

use super::{EngineError, InferenceEngine};

/// A deterministic in-process [`InferenceEngine`].
pub struct MockEngine {
    input: Tensor,
    output: Tensor,
    invocations: Arc<AtomicUsize>,
    invoke_delay: Duration,
    fail_invoke: bool,
}

impl MockEngine {
    /// Creates a mock engine over explicit input/output tensors.
    pub fn new(input: Tensor, output: Tensor) -> Self {
        Self {
            input,
            output,
            invocations: Arc::new(AtomicUsize::new(0)),
            invoke_delay: Duration::ZERO,
            fail_invoke: false,
        }
    }

    /// A float32-in / float32-out model shape.
    pub fn float_model(input_count: usize, output_count: usize) -> Self {
        Self::new(
            Tensor::new(ElementType::Float32, input_count, Quantization::None),
            Tensor::new(ElementType::Float32, output_count, Quantization::None),
        )
    }

    /// An int8-quantized model shape using the same affine parameters for
    /// input and output.
    pub fn quantized_model(
        input_count: usize,
        output_count: usize,
        scale: f32,
        zero_point: i32,
    ) -> Self {
        let quant = Quantization::Affine { scale, zero_point };
        Self::new(
            Tensor::new(ElementType::Int8, input_count, quant),
            Tensor::new(ElementType::Int8, output_count, quant),
        )
    }

    /// Makes every invocation take at least `delay` of wall time, to
    /// widen race windows in concurrency tests.
    pub fn with_invoke_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = delay;
        self
    }

    /// Makes every invocation fail.
    pub fn failing(mut self) -> Self {
        self.fail_invoke = true;
        self
    }

    /// Handle observing how many times [`invoke`](InferenceEngine::invoke)
    /// ran.
    pub fn invocation_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

impl InferenceEngine for MockEngine {
    fn input(&mut self) -> &mut Tensor {
        &mut self.input
    }

    fn output(&self) -> &Tensor {
        &self.output
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        if self.fail_invoke {
            return Err(EngineError::InvokeFailed("mock engine failure".to_string()));
        }
        if !self.invoke_delay.is_zero() {
            std::thread::sleep(self.invoke_delay);
        }

        // Read the input back as floats, whatever its representation.
        let samples = dequantize(&self.input)?;

        // Echo into the output tensor in its native representation.
        let out_quant = self.output.quantization();
        match self.output.element_type() {
            ElementType::Float32 => {
                for (i, chunk) in self.output.bytes_mut().chunks_exact_mut(4).enumerate() {
                    let v = samples.get(i).copied().unwrap_or(0.0);
                    chunk.copy_from_slice(&v.to_le_bytes());
                }
            }
            ElementType::Int8 => {
                let (scale, zero_point) = match out_quant {
                    Quantization::Affine { scale, zero_point } => (scale, zero_point),
                    Quantization::None => (1.0, 0),
                };
                for (i, byte) in self.output.bytes_mut().iter_mut().enumerate() {
                    let v = samples.get(i).copied().unwrap_or(0.0);
                    *byte = quantize(v, scale, zero_point) as u8;
                }
            }
            other => {
                return Err(EngineError::InvokeFailed(format!(
                    "mock engine cannot produce {other} output"
                )))
            }
        }

        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
