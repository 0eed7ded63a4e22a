//! TCP accept loop and worker-task management.
//!
//! This module is responsible for:
//!
//! 1. Binding the TCP listener on the configured address.
//! 2. Accepting incoming connections and spawning one
//!    [`ConnectionWorker`] task per connection.
//! 3. Tracking worker tasks in a [`JoinSet`] so shutdown can abort and
//!    join every outstanding connection instead of leaking tasks.
//! 4. Escalating a process-fatal worker result (corrupt model metadata)
//!    into a server shutdown.
//!
//! # Accept failure policy
//!
//! A failed `accept()` is logged and the loop continues. This is a
//! deliberate keep-serving policy: transient resource exhaustion (out of
//! file descriptors, a connection reset during the handshake) must not
//! take down the connections that are already being served.
//!
//! # Scalability
//!
//! The accept loop never blocks on a worker: it hands the socket off and
//! immediately resumes accepting. Tokio's multi-threaded runtime
//! distributes worker tasks across OS threads automatically.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::application::{CloseReason, ConnectionWorker};
use crate::domain::ServerConfig;
use crate::engine::EngineContext;

/// The inference server: a bound listener plus the shared engine context.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<EngineContext>,
    score_threshold: f32,
}

impl Server {
    /// Binds the listener on the configured address.
    ///
    /// Binding is separate from serving so callers (and tests) can learn
    /// the actual bound address before any connection is accepted,
    /// important when the configured port is 0 (ephemeral).
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be
    /// bound (already in use, insufficient privileges).
    pub async fn bind(config: &ServerConfig, ctx: Arc<EngineContext>) -> anyhow::Result<Self> {
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind inference listener on {addr}"))?;

        info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            ctx,
            score_threshold: config.inference.score_threshold,
        })
    }

    /// The address the listener is actually bound to.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the socket is in a broken state.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until `shutdown` flips to `true` or a worker
    /// reports a process-fatal failure.
    ///
    /// On exit, every outstanding worker task is aborted and joined;
    /// no tasks are leaked past this call.
    ///
    /// # Errors
    ///
    /// Returns an error only for the process-fatal corrupt-model case;
    /// an ordinary shutdown returns `Ok(())`.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut workers: JoinSet<CloseReason> = JoinSet::new();
        let mut fatal: Option<CloseReason> = None;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown too.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown signal received; stopping accept loop");
                        break;
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted connection");
                            let worker = ConnectionWorker::new(
                                stream,
                                peer,
                                Arc::clone(&self.ctx),
                                self.score_threshold,
                            );
                            workers.spawn(worker.run());
                        }
                        Err(e) => {
                            // Keep serving: a failed accept must not take
                            // down established connections.
                            error!("accept failed: {e}");
                        }
                    }
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    match joined {
                        Ok(reason) if reason.is_fatal_to_process() => {
                            error!("worker reported fatal failure: {reason}");
                            fatal = Some(reason);
                            break;
                        }
                        Ok(reason) => {
                            debug!("worker finished: {reason}");
                        }
                        Err(join_err) => {
                            warn!("worker task aborted abnormally: {join_err}");
                        }
                    }
                }
            }
        }

        // Abort and join every outstanding worker so no task outlives the
        // server.
        let outstanding = workers.len();
        if outstanding > 0 {
            info!(outstanding, "aborting outstanding connection workers");
        }
        workers.shutdown().await;

        match fatal {
            Some(reason) => Err(anyhow::anyhow!(
                "server stopped on fatal worker failure: {reason}"
            )),
            None => Ok(()),
        }
    }
}
