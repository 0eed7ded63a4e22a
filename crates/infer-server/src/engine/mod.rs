//! Inference engine integration: the engine trait, its error type, and
//! the process-wide [`EngineContext`] that enforces the serialization
//! discipline around the shared compute resource.
//!
//! # Why a context object? (for beginners)
//!
//! The engine owns exactly one input tensor, one output tensor, and one
//! scratch arena. None of them are internally synchronized, so two
//! concurrent invocations would silently corrupt each other's tensors;
//! connection A could receive scores computed from connection B's image.
//! [`EngineContext`] makes the unsafe thing unrepresentable: the engine
//! is only reachable through an async mutex, and a worker holds the lock
//! from the moment it writes the input tensor until it has copied the
//! scores back out.

pub mod mock;

use std::time::Duration;

use infer_core::tensor::MarshalError;
use infer_core::{ElementType, Tensor};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::infrastructure::watchdog::Watchdog;

/// Errors reported by the engine or its model metadata.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine reported a failure while executing the model graph.
    #[error("engine invocation failed: {0}")]
    InvokeFailed(String),

    /// The loaded model's quantization metadata is unusable. Fatal to the
    /// whole process: no request against this model can ever succeed.
    #[error("corrupt model metadata: {0}")]
    CorruptModel(#[from] MarshalError),

    /// The model declares an input element type the wire protocol cannot
    /// carry. Detected at startup, before the listener binds.
    #[error("model input type {0} has no wire representation")]
    UnsupportedInput(ElementType),
}

/// The inference engine as consumed by the protocol pipeline.
///
/// Implementations wrap the real on-device runtime (model graph, operator
/// kernels, tensor arena) behind three operations. The pipeline writes
/// request samples into [`input`](Self::input), calls
/// [`invoke`](Self::invoke), and reads raw scores from
/// [`output`](Self::output). Tensor buffers are allocated by the engine
/// at load time and live as long as the engine does.
pub trait InferenceEngine: Send {
    /// The input tensor the next invocation will consume.
    fn input(&mut self) -> &mut Tensor;

    /// The output tensor produced by the last invocation.
    fn output(&self) -> &Tensor;

    /// Runs the model on the current input tensor contents.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvokeFailed`] on any runtime failure.
    /// Once started, an invocation runs to completion or failure; there
    /// is no cancellation.
    fn invoke(&mut self) -> Result<(), EngineError>;
}

// ── Engine context ────────────────────────────────────────────────────────────

/// Process-wide handle over the single shared engine instance.
///
/// Holds the engine behind an async mutex and owns the watchdog whose
/// budget is extended around each invocation. Workers access the engine
/// exclusively through [`EngineContext::lock`].
pub struct EngineContext {
    engine: Mutex<Box<dyn InferenceEngine>>,
    watchdog: Watchdog,
}

impl EngineContext {
    pub fn new(engine: Box<dyn InferenceEngine>, watchdog: Watchdog) -> Self {
        Self {
            engine: Mutex::new(engine),
            watchdog,
        }
    }

    /// Acquires exclusive access to the engine.
    ///
    /// The guard must be held for the whole input-write → invoke →
    /// output-read sequence and released before the response is sent, so
    /// a slow network peer never stalls other connections' compute.
    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn InferenceEngine>> {
        self.engine.lock().await
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Validates the loaded model's tensor metadata once at startup.
    ///
    /// Checks that the input element type has a wire representation
    /// (float32 direct path or int8 quantizing path) and that neither
    /// tensor declares affine quantization with a zero scale. Failing
    /// here aborts the process before the listener binds; serving a
    /// corrupt model would fail every request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedInput`] or
    /// [`EngineError::CorruptModel`].
    pub async fn validate(&self) -> Result<(), EngineError> {
        let mut engine = self.engine.lock().await;

        let input_type = engine.input().element_type();
        if !matches!(input_type, ElementType::Float32 | ElementType::Int8) {
            return Err(EngineError::UnsupportedInput(input_type));
        }

        engine.input().validate_quantization()?;
        engine.output().validate_quantization()?;
        Ok(())
    }

    /// Performs throwaway invocations so that reported latencies are not
    /// skewed by cold caches and first-run arena setup.
    ///
    /// The input tensor is filled with dummy data (every byte 0x01) and
    /// the engine invoked `runs` times under an extended watchdog budget.
    ///
    /// # Errors
    ///
    /// Propagates the first invocation failure; a model that cannot even
    /// warm up should not serve.
    pub async fn warmup(&self, runs: u32) -> Result<(), EngineError> {
        let mut engine = self.engine.lock().await;
        let _budget = self.watchdog.extend();

        engine.input().bytes_mut().fill(0x01);
        for run in 0..runs {
            engine.invoke().map_err(|e| {
                EngineError::InvokeFailed(format!("warmup run {} failed: {e}", run + 1))
            })?;
        }

        info!(runs, "completed warmup runs");
        Ok(())
    }
}

/// Convenience constructor used by `main` and the integration tests.
pub fn context_with_budgets(
    engine: Box<dyn InferenceEngine>,
    default_budget: Duration,
    extended_budget: Duration,
) -> EngineContext {
    EngineContext::new(engine, Watchdog::new(default_budget, extended_budget))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::mock::MockEngine;
    use super::*;
    use infer_core::Quantization;

    fn context(engine: MockEngine) -> EngineContext {
        context_with_budgets(
            Box::new(engine),
            Duration::from_secs(5),
            Duration::from_secs(20),
        )
    }

    #[tokio::test]
    async fn test_validate_accepts_float_model() {
        let ctx = context(MockEngine::float_model(784, 10));
        assert!(ctx.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_accepts_quantized_model() {
        let ctx = context(MockEngine::quantized_model(784, 10, 1.0 / 255.0, -128));
        assert!(ctx.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_unsupported_input_type() {
        let input = Tensor::new(ElementType::Int32, 4, Quantization::None);
        let output = Tensor::new(ElementType::Float32, 4, Quantization::None);
        let ctx = context(MockEngine::new(input, output));
        assert!(matches!(
            ctx.validate().await,
            Err(EngineError::UnsupportedInput(ElementType::Int32))
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_zero_scale_output() {
        let input = Tensor::new(ElementType::Float32, 4, Quantization::None);
        let output = Tensor::new(
            ElementType::Int8,
            4,
            Quantization::Affine {
                scale: 0.0,
                zero_point: 0,
            },
        );
        let ctx = context(MockEngine::new(input, output));
        assert!(matches!(
            ctx.validate().await,
            Err(EngineError::CorruptModel(_))
        ));
    }

    #[tokio::test]
    async fn test_warmup_invokes_engine_requested_number_of_times() {
        let engine = MockEngine::float_model(8, 4);
        let invocations = engine.invocation_counter();
        let ctx = context(engine);

        ctx.warmup(10).await.expect("warmup must succeed");
        assert_eq!(invocations.load(std::sync::atomic::Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_warmup_restores_watchdog_budget() {
        let ctx = context(MockEngine::float_model(8, 4));
        ctx.warmup(2).await.expect("warmup must succeed");
        assert_eq!(ctx.watchdog().budget(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_warmup_failure_propagates_and_restores_budget() {
        let ctx = context(MockEngine::float_model(8, 4).failing());
        assert!(matches!(
            ctx.warmup(3).await,
            Err(EngineError::InvokeFailed(_))
        ));
        assert_eq!(ctx.watchdog().budget(), Duration::from_secs(5));
    }
}
