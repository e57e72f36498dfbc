//! Wire protocol for the chunkserve download service.
//!
//! A client asks for one chunk at a time; the server answers with base64
//! chunk data, an end-of-transfer message carrying the file checksum, or
//! an error. All messages are flat JSON objects sharing the same five
//! fields, disambiguated by `type` and the `seq` end sentinel.

pub mod constants;
pub mod wire;

// Re-export primary types for convenience.
pub use constants::END_SEQ;
pub use wire::{DownloadRequest, DownloadResponse};
