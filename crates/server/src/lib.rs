//! WebSocket transport for the chunkserve download service.
//!
//! Accepts any number of client connections, decodes JSON download
//! requests, dispatches them to a [`Handler`], and writes serialized
//! responses back. Connection lifecycle (ping/pong keepalive, graceful
//! shutdown) lives here; what a request *means* lives in
//! `chunkserve-transfer`.

mod connection;
mod handler;
mod server;

pub use connection::Sender;
pub use handler::{Handler, HandlerFuture, TransferHandler};
pub use server::{DownloadServer, ServerConfig};

/// Send buffer capacity per connection.
///
/// Responses are produced in lockstep with requests, so a shallow buffer
/// is enough; it only has to absorb scheduling jitter between the
/// handler task and the write pump.
pub const SEND_BUFFER_SIZE: usize = 32;

/// Errors produced by the download server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
