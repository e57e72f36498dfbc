//! Download client for the chunkserve protocol.
//!
//! Requests chunks 0, 1, 2… in lockstep over one WebSocket connection,
//! streams them into a sink, and verifies the end-of-transfer checksum
//! against a digest of the bytes actually received. Resuming after a
//! restart is just starting the loop at a later sequence number; the
//! server keeps no session to resume.

use std::io::Write;

use futures_util::{SinkExt, StreamExt};
use sha2::{Digest, Sha256};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};

use chunkserve_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_REQUEST_TIMEOUT};
use chunkserve_protocol::wire::{DownloadRequest, DownloadResponse};

/// Errors from the download client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    /// The server reported a failure.
    #[error("server error: {0}")]
    Server(String),

    /// The server answered with something the protocol does not allow
    /// at this point in the transfer.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The reassembled bytes do not hash to the server's checksum.
    #[error("checksum mismatch: server reported {expected}, received bytes hash to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The server's reported total differs from the bytes received.
    #[error("size mismatch: server reported {reported} bytes, received {received}")]
    SizeMismatch { reported: u64, received: u64 },
}

/// Result of a completed, verified download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSummary {
    /// Total file size reported by the end-of-transfer message.
    pub total_size: u64,
    /// Verified whole-file SHA-256, lowercase hex.
    pub checksum: String,
    /// Number of chunks received.
    pub chunks: u64,
}

/// WebSocket client for one download server.
pub struct DownloadClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl DownloadClient {
    /// Connects to a download server, e.g. `ws://host:port`.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let mut ws_config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws, _) = connect_async_with_config(url, Some(ws_config), false).await?;
        Ok(Self { ws })
    }

    /// Downloads `filename` into `dest`, verifying size and checksum.
    ///
    /// Chunks are requested strictly in order starting at 0. On success
    /// the sink holds exactly the file's bytes and the returned summary
    /// carries the verified checksum.
    pub async fn fetch<W: Write>(
        &mut self,
        filename: &str,
        dest: &mut W,
    ) -> Result<DownloadSummary, ClientError> {
        let mut hasher = Sha256::new();
        let mut received: u64 = 0;
        let mut seq: u64 = 0;

        loop {
            let resp = self.round_trip(&DownloadRequest::new(filename, seq)).await?;
            match resp {
                DownloadResponse::Chunk {
                    filename: got_name,
                    seq: got_seq,
                    payload,
                    sent_bytes,
                } => {
                    if got_name != filename || got_seq != seq {
                        return Err(ClientError::Protocol(format!(
                            "expected chunk {seq} of {filename}, got chunk {got_seq} of {got_name}"
                        )));
                    }
                    hasher.update(&payload);
                    dest.write_all(&payload)?;
                    received += payload.len() as u64;
                    if sent_bytes != received {
                        // The server computes sentBytes arithmetically; a
                        // skew here means the file changed underneath the
                        // transfer. The checksum check will have the
                        // final word.
                        tracing::warn!(
                            filename,
                            seq,
                            sent_bytes,
                            received,
                            "server byte count disagrees with received bytes"
                        );
                    }
                    tracing::debug!(filename, seq, received, "chunk received");
                    seq += 1;
                }

                DownloadResponse::End {
                    filename: got_name,
                    total_size,
                    checksum,
                } => {
                    if got_name != filename {
                        return Err(ClientError::Protocol(format!(
                            "end of transfer names {got_name}, requested {filename}"
                        )));
                    }
                    dest.flush()?;
                    let actual = hex::encode(hasher.finalize());
                    if actual != checksum {
                        return Err(ClientError::ChecksumMismatch {
                            expected: checksum,
                            actual,
                        });
                    }
                    if total_size != received {
                        return Err(ClientError::SizeMismatch {
                            reported: total_size,
                            received,
                        });
                    }
                    tracing::info!(filename, total_size, chunks = seq, "download verified");
                    return Ok(DownloadSummary {
                        total_size,
                        checksum,
                        chunks: seq,
                    });
                }

                DownloadResponse::Error { message } => {
                    return Err(ClientError::Server(message));
                }
            }
        }
    }

    /// Sends one request and waits for the matching response.
    async fn round_trip(&mut self, req: &DownloadRequest) -> Result<DownloadResponse, ClientError> {
        let json = serde_json::to_string(req)?;
        self.ws.send(WsMessage::Text(json.into())).await?;

        tokio::time::timeout(WS_REQUEST_TIMEOUT, self.next_text())
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Reads frames until the next text message, answering pings.
    async fn next_text(&mut self) -> Result<DownloadResponse, ClientError> {
        loop {
            match self.ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(serde_json::from_str(&text)?);
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    self.ws.send(WsMessage::Pong(data)).await?;
                }
                Some(Ok(WsMessage::Close(_))) | None => return Err(ClientError::Closed),
                Some(Ok(_)) => continue, // Pong/binary frames ignored.
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Closes the connection with a best-effort close frame.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
