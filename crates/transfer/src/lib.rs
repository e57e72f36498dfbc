//! Core of the chunked download protocol: chunk arithmetic, filename
//! safety, positioned chunk reads, and the end-of-transfer checksum.
//!
//! Everything here is synchronous and stateless across calls; the
//! transport layer decides how requests reach [`TransferEngine::process`].

mod checksum;
mod engine;
mod plan;
mod validation;

pub use checksum::file_sha256;
pub use engine::{ChunkResult, TransferConfig, TransferEngine};
pub use plan::{bytes_sent_through, chunk_bounds, is_complete};
pub use validation::is_valid_filename;

/// Default chunk size: 500 KiB.
///
/// A protocol constant agreed out-of-band between client and server; the
/// wire carries no negotiation for it, and changing it on a live server
/// breaks resumability of in-flight transfers.
pub const DEFAULT_CHUNK_SIZE: u64 = 500 * 1024;

/// Errors produced while serving a chunk request.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The request's `type` field was not `"request"`.
    #[error("invalid request type: {0}")]
    InvalidRequestType(String),

    /// The filename failed safety validation.
    #[error("invalid filename")]
    InvalidFilename,

    /// No regular file with that name under the storage root.
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk bounds were requested at or past end-of-file. Unreachable
    /// when completion is checked first; treated as an I/O-class failure
    /// by the transport if it ever surfaces.
    #[error("sequence {seq} is past the end of a {file_size}-byte file")]
    InvalidSequence { seq: u64, file_size: u64 },
}
