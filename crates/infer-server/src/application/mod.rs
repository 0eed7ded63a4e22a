//! Application layer: the per-request use cases (ingest, respond) and
//! the per-connection worker state machine that sequences them.

pub mod ingest;
pub mod respond;
pub mod worker;

pub use worker::{CloseReason, ConnectionWorker};

use infer_core::ProtocolError;
use thiserror::Error;

use crate::engine::EngineError;

/// Any failure along the request/response pipeline.
///
/// Every variant terminates the current connection. One, corrupt model
/// metadata surfacing from the engine, is additionally fatal to the
/// process, because no request against a corrupt model can ever succeed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The peer closed the connection between requests. The normal end
    /// of a connection's life, not a failure.
    #[error("peer disconnected")]
    Disconnected,

    /// Socket read/write failure, including a peer that closed mid-frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The engine failed, or its model metadata is corrupt.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PipelineError {
    /// `true` for failures that invalidate the whole server, not just
    /// this connection.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(self, PipelineError::Engine(EngineError::CorruptModel(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infer_core::tensor::MarshalError;

    #[test]
    fn test_corrupt_model_is_fatal_to_process() {
        let err = PipelineError::Engine(EngineError::CorruptModel(
            MarshalError::CorruptQuantization,
        ));
        assert!(err.is_fatal_to_process());
    }

    #[test]
    fn test_ordinary_failures_only_close_the_connection() {
        let protocol = PipelineError::Protocol(ProtocolError::BadOpcode(0x02));
        let engine = PipelineError::Engine(EngineError::InvokeFailed("x".to_string()));
        let disconnect = PipelineError::Disconnected;
        assert!(!protocol.is_fatal_to_process());
        assert!(!engine.is_fatal_to_process());
        assert!(!disconnect.is_fatal_to_process());
    }
}
