//! The per-connection worker state machine.
//!
//! Each accepted connection is owned by exactly one worker, which loops
//! through one request/response exchange per iteration:
//!
//! ```text
//! AwaitRequest ──► Invoking ──► SendingResponse ──┐
//!      ▲                                          │
//!      └──────────────────────────────────────────┘
//!                        │ (any error)
//!                        ▼
//!                 Closed(reason)
//! ```
//!
//! Engine access discipline: the worker waits for the request opcode
//! *without* holding the engine lock, then acquires it before writing
//! the input tensor and holds it through `invoke()` and the output-score
//! copy. The lock is released before the response is sent, so a slow
//! peer only stalls its own connection.
//!
//! On close the socket is dropped and the worker task ends; there is no
//! retry; the client reconnects for further requests.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use infer_core::ProtocolError;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{EngineContext, EngineError};

use super::ingest::{ingest_payload, read_request_opcode};
use super::respond::{collect_scores, send_response};
use super::PipelineError;

/// Why a connection was closed. One reason per connection lifetime.
#[derive(Debug)]
pub enum CloseReason {
    /// The peer hung up cleanly between requests.
    PeerDisconnected,
    /// The peer violated the wire protocol.
    Protocol(ProtocolError),
    /// The transport failed, or the peer vanished mid-frame.
    Io(std::io::Error),
    /// The engine failed, or its model metadata turned out corrupt.
    Engine(EngineError),
}

impl CloseReason {
    /// `true` when this close reason invalidates the whole server (a
    /// corrupt model), so the listener should shut down rather than keep
    /// accepting connections that can never be served.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(
            self,
            CloseReason::Engine(EngineError::CorruptModel(_))
        )
    }
}

impl From<PipelineError> for CloseReason {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Disconnected => CloseReason::PeerDisconnected,
            PipelineError::Io(e) => CloseReason::Io(e),
            PipelineError::Protocol(e) => CloseReason::Protocol(e),
            PipelineError::Engine(e) => CloseReason::Engine(e),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerDisconnected => f.write_str("peer disconnected"),
            CloseReason::Protocol(e) => write!(f, "protocol violation: {e}"),
            CloseReason::Io(e) => write!(f, "I/O error: {e}"),
            CloseReason::Engine(e) => write!(f, "engine error: {e}"),
        }
    }
}

/// Pipeline phase the worker is currently in; recorded so close log
/// lines say where a connection died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    AwaitRequest,
    Invoking,
    SendingResponse,
}

/// The per-connection execution context.
///
/// Generic over the stream type so unit tests can drive it with an
/// in-memory duplex pipe instead of a real TCP socket.
pub struct ConnectionWorker<S> {
    id: Uuid,
    peer: SocketAddr,
    stream: S,
    ctx: Arc<EngineContext>,
    score_threshold: f32,
    state: WorkerState,
}

impl<S> ConnectionWorker<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr, ctx: Arc<EngineContext>, score_threshold: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            ctx,
            score_threshold,
            state: WorkerState::AwaitRequest,
        }
    }

    /// Runs the connection to completion and returns why it closed.
    ///
    /// Consumes the worker; the socket is dropped (closed) on return.
    pub async fn run(mut self) -> CloseReason {
        info!(conn = %self.id, peer = %self.peer, "client connected");

        let reason = loop {
            match self.serve_one().await {
                Ok(()) => {
                    debug!(conn = %self.id, "request served");
                }
                Err(err) => break CloseReason::from(err),
            }
        };

        match reason {
            CloseReason::PeerDisconnected => {
                info!(conn = %self.id, peer = %self.peer, "connection closed: {reason}");
            }
            _ => {
                warn!(
                    conn = %self.id,
                    peer = %self.peer,
                    state = ?self.state,
                    "connection closed: {reason}"
                );
            }
        }
        reason
    }

    /// One complete request/response exchange.
    async fn serve_one(&mut self) -> Result<(), PipelineError> {
        // AwaitRequest: block on the opcode without the engine lock so an
        // idle connection cannot starve other workers.
        self.state = WorkerState::AwaitRequest;
        read_request_opcode(&mut self.stream).await?;

        let (scores, inference_time_us) = {
            // The lock covers input-write, invoke, and output-read: the
            // tensors are shared mutable state with no synchronization of
            // their own.
            let mut engine = self.ctx.lock().await;
            ingest_payload(&mut self.stream, engine.input()).await?;

            self.state = WorkerState::Invoking;
            let inference_time_us = {
                // Inference may exceed the default liveness budget; the
                // guard restores it on every exit path.
                let _budget = self.ctx.watchdog().extend();
                let started = Instant::now();
                engine.invoke()?;
                started.elapsed().as_micros() as i64
            };

            self.state = WorkerState::SendingResponse;
            let scores = collect_scores(engine.output(), self.score_threshold)?;
            (scores, inference_time_us)
        };

        // The engine lock is released; only this connection waits on the
        // peer now.
        send_response(&mut self.stream, scores, inference_time_us).await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
