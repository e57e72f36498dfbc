//! Handler trait for decoded download requests, and the production
//! handler that serves them from a [`TransferEngine`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chunkserve_protocol::wire::{DownloadRequest, DownloadResponse};
use chunkserve_transfer::{ChunkResult, TransferEngine, TransferError};

use crate::connection::Sender;

/// A boxed future returned by handler methods.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Trait for handling download requests from a client.
///
/// The transport decodes frames and calls [`on_request`] with a
/// cloneable [`Sender`] for the response; implementors own everything
/// else. The seam exists so transport tests can run against a trivial
/// handler and so the engine never learns about WebSockets.
///
/// [`on_request`]: Handler::on_request
pub trait Handler: Send + Sync + 'static {
    /// Called for each decoded download request.
    fn on_request(&self, sender: Sender, req: DownloadRequest) -> HandlerFuture<'_>;

    /// Called when a client connection closes (cleanup hook).
    fn on_disconnected(&self) -> HandlerFuture<'_> {
        Box::pin(async {})
    }
}

/// The production handler: runs each request through the engine on the
/// blocking pool and maps failures to wire errors.
pub struct TransferHandler {
    engine: Arc<TransferEngine>,
}

impl TransferHandler {
    /// Creates a handler serving from the given engine.
    pub fn new(engine: Arc<TransferEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for TransferHandler {
    fn on_request(&self, sender: Sender, req: DownloadRequest) -> HandlerFuture<'_> {
        let engine = Arc::clone(&self.engine);
        Box::pin(async move {
            let response = serve(engine, req).await;
            let _ = sender.send_response(&response);
        })
    }
}

/// Runs one request to a wire response. File I/O happens on the
/// blocking pool; the connection pumps stay responsive meanwhile.
async fn serve(engine: Arc<TransferEngine>, req: DownloadRequest) -> DownloadResponse {
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = engine.process(&req);
        (req, outcome)
    })
    .await;

    let (req, outcome) = match outcome {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("transfer task failed: {e}");
            return DownloadResponse::error("server error: internal failure");
        }
    };

    match outcome {
        Ok(result) => {
            match &result {
                ChunkResult::Chunk {
                    seq, sent_bytes, ..
                } => {
                    tracing::info!(filename = %req.filename, seq, sent = sent_bytes, "chunk served");
                }
                ChunkResult::End { total_size, .. } => {
                    tracing::info!(filename = %req.filename, total = total_size, "transfer complete");
                }
            }
            DownloadResponse::from(result)
        }
        Err(err) => error_response(&err),
    }
}

/// Maps an engine failure to its wire error, logged by class: client
/// mistakes at warn, absence at info, genuine server failures at error.
fn error_response(err: &TransferError) -> DownloadResponse {
    match err {
        TransferError::InvalidRequestType(_) | TransferError::InvalidFilename => {
            tracing::warn!("rejected request: {err}");
            DownloadResponse::error(err.to_string())
        }
        TransferError::NotFound(_) => {
            tracing::info!("{err}");
            DownloadResponse::error(err.to_string())
        }
        err => {
            tracing::error!("request failed: {err}");
            DownloadResponse::error(format!("server error: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_pass_message_through() {
        let resp = error_response(&TransferError::InvalidRequestType("upload".into()));
        assert_eq!(
            resp,
            DownloadResponse::error("invalid request type: upload")
        );

        let resp = error_response(&TransferError::InvalidFilename);
        assert_eq!(resp, DownloadResponse::error("invalid filename"));
    }

    #[test]
    fn not_found_keeps_its_distinct_shape() {
        let resp = error_response(&TransferError::NotFound("ghost.bin".into()));
        assert_eq!(resp, DownloadResponse::error("file not found: ghost.bin"));
    }

    #[test]
    fn io_failures_get_server_error_prefix() {
        let io = TransferError::Io(std::io::Error::other("disk gone"));
        let resp = error_response(&io);
        match resp {
            DownloadResponse::Error { message } => {
                assert!(message.starts_with("server error:"), "{message}");
                assert!(message.contains("disk gone"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_sequence_is_server_class() {
        let err = TransferError::InvalidSequence {
            seq: 9,
            file_size: 4,
        };
        match error_response(&err) {
            DownloadResponse::Error { message } => {
                assert!(message.starts_with("server error:"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }
}
