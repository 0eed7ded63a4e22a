//! Edge-Infer client library: a thin connection wrapper over the binary
//! inference protocol.
//!
//! The server treats every connection the same way, so this client is
//! deliberately simple: connect once, then issue any number of
//! request/response exchanges over the same stream. Each exchange is
//! independent; the protocol has no session state.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use infer_core::{decode_response, encode_request, ProtocolError, ResponseFrame};

/// Error type for client-side protocol operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection failed or was closed mid-frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server's response did not decode as a valid frame.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A connection to a running inference server.
pub struct InferenceClient {
    stream: TcpStream,
}

impl InferenceClient {
    /// Opens a TCP connection to the server at `addr`.
    ///
    /// `addr` takes anything resolvable: `"device.local:1234"`, an
    /// `IP:port` string, or a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if resolution or the connection fails.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        if let Ok(peer) = stream.peer_addr() {
            debug!(%peer, "connected to inference server");
        }
        Ok(Self { stream })
    }

    /// Runs one inference exchange: sends `payload` as a request frame
    /// and reads the complete response.
    ///
    /// `payload` must match the byte length the server's model expects:
    /// the input tensor's byte length on the float path, or four bytes
    /// per element on the quantizing path. A mismatch desynchronizes the
    /// stream and the server closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on transport failure (including the
    /// server closing the connection after a protocol violation).
    pub async fn infer(&mut self, payload: &[u8]) -> Result<ResponseFrame, ClientError> {
        self.stream.write_all(&encode_request(payload)).await?;

        // The score count tells us how long the rest of the frame is.
        let mut frame = vec![0u8; 4];
        self.stream.read_exact(&mut frame).await?;
        let count = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

        frame.resize(4 + count * 4 + 8, 0);
        self.stream.read_exact(&mut frame[4..]).await?;

        let (response, consumed) = decode_response(&frame)?;
        debug_assert_eq!(consumed, frame.len());
        debug!(
            scores = response.scores.len(),
            inference_time_us = response.inference_time_us,
            "response received"
        );
        Ok(response)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use infer_core::{encode_response, OPCODE_INFER};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Spawns a one-shot fake server that reads `expect_payload_len`
    /// request bytes after the opcode and answers with `response`.
    async fn fake_server(
        expect_payload_len: usize,
        response: ResponseFrame,
    ) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");

            let mut request = vec![0u8; 1 + expect_payload_len];
            stream.read_exact(&mut request).await.expect("request");
            assert_eq!(request[0], OPCODE_INFER);

            stream
                .write_all(&encode_response(&response))
                .await
                .expect("response");
        });
        addr
    }

    #[tokio::test]
    async fn test_infer_round_trips_one_exchange() {
        let expected = ResponseFrame {
            scores: vec![0.8, 0.1, 0.05],
            inference_time_us: 42_000,
        };
        let addr = fake_server(16, expected.clone()).await;

        let mut client = InferenceClient::connect(addr).await.expect("connect");
        let response = client.infer(&[0u8; 16]).await.expect("infer");
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn test_infer_accepts_empty_score_set() {
        let expected = ResponseFrame {
            scores: vec![],
            inference_time_us: 9,
        };
        let addr = fake_server(4, expected.clone()).await;

        let mut client = InferenceClient::connect(addr).await.expect("connect");
        let response = client.infer(&[0u8; 4]).await.expect("infer");
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn test_infer_reports_server_close_as_io_error() {
        // Server that accepts and immediately hangs up, the way the real
        // server does after a protocol violation.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            drop(stream);
        });

        let mut client = InferenceClient::connect(addr).await.expect("connect");
        let err = client.infer(&[0u8; 8]).await.expect_err("must fail");
        assert!(matches!(err, ClientError::Io(_)));
    }
}
