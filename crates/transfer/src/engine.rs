//! The transfer engine: one request in, one structured result out.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use chunkserve_protocol::wire::{DownloadRequest, DownloadResponse};

use crate::{DEFAULT_CHUNK_SIZE, TransferError, checksum, plan, validation};

/// Process-wide transfer settings, fixed at construction.
///
/// There is no runtime mutation: reconfiguring means restarting the
/// process, which also restates the out-of-band chunk-size agreement.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Directory under which every requestable file must directly reside.
    pub storage_root: PathBuf,
    /// Chunk size in bytes. 0 selects [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: u64,
}

/// Successful outcome of one chunk request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkResult {
    /// One chunk of raw file bytes; the transport base64-encodes them.
    Chunk {
        filename: String,
        seq: u64,
        payload: Vec<u8>,
        /// Offset of the end of this chunk; equals the bytes a client
        /// holds after receiving chunks `0..=seq` in order.
        sent_bytes: u64,
    },
    /// The requested sequence is at or past end-of-file: the transfer is
    /// done and the whole-file checksum stands in for a chunk body.
    End {
        filename: String,
        total_size: u64,
        checksum: String,
    },
}

impl From<ChunkResult> for DownloadResponse {
    fn from(result: ChunkResult) -> Self {
        match result {
            ChunkResult::Chunk {
                filename,
                seq,
                payload,
                sent_bytes,
            } => DownloadResponse::chunk(filename, seq, payload, sent_bytes),
            ChunkResult::End {
                filename,
                total_size,
                checksum,
            } => DownloadResponse::end(filename, total_size, checksum),
        }
    }
}

/// Serves chunk requests from a fixed storage root.
///
/// The engine holds no per-transfer state: every call opens its own file
/// handle, reads fresh metadata, and releases the handle before
/// returning. Resumption is entirely the client's `seq` bookkeeping.
pub struct TransferEngine {
    storage_root: PathBuf,
    chunk_size: u64,
}

impl TransferEngine {
    /// Creates an engine from the given configuration.
    pub fn new(config: TransferConfig) -> Self {
        let chunk_size = if config.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            config.chunk_size
        };
        Self {
            storage_root: config.storage_root,
            chunk_size,
        }
    }

    /// The fixed chunk size this engine serves.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Resolves a validated filename to its path under the storage root.
    fn resolve(&self, filename: &str) -> PathBuf {
        self.storage_root.join(filename)
    }

    /// Returns `true` if the name resolves to an existing regular file.
    pub fn file_exists(&self, filename: &str) -> bool {
        self.resolve(filename).is_file()
    }

    /// Current size of the file in bytes.
    pub fn file_size(&self, filename: &str) -> Result<u64, TransferError> {
        Ok(std::fs::metadata(self.resolve(filename))?.len())
    }

    /// Reads chunk `seq` with a positioned read: seek to the chunk offset
    /// and read exactly its length.
    ///
    /// The file size is re-read from the open handle, never cached from
    /// an earlier call. A file truncated underneath us surfaces as an
    /// I/O error from the exact read, not as short data.
    pub fn read_chunk(&self, filename: &str, seq: u64) -> Result<Vec<u8>, TransferError> {
        let mut file = File::open(self.resolve(filename))?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(std::io::Error::other("no longer a regular file").into());
        }
        let (offset, len) = plan::chunk_bounds(seq, self.chunk_size, meta.len())?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Whole-file checksum, computed at completion time.
    pub fn file_checksum(&self, filename: &str) -> Result<String, TransferError> {
        checksum::file_sha256(&self.resolve(filename))
    }

    /// Serves one request: a chunk, the end of the transfer, or an error.
    ///
    /// Validation runs before any filesystem access. The checksum is
    /// computed from the file's state at completion time; a file mutated
    /// mid-transfer can therefore hash to something other than the bytes
    /// that were streamed, and the client's verification is where that
    /// surfaces.
    pub fn process(&self, req: &DownloadRequest) -> Result<ChunkResult, TransferError> {
        if !req.is_request() {
            return Err(TransferError::InvalidRequestType(req.kind.clone()));
        }
        if !validation::is_valid_filename(&req.filename) {
            return Err(TransferError::InvalidFilename);
        }
        if !self.file_exists(&req.filename) {
            return Err(TransferError::NotFound(req.filename.clone()));
        }

        let file_size = self.file_size(&req.filename)?;
        if plan::is_complete(req.seq, self.chunk_size, file_size) {
            let checksum = self.file_checksum(&req.filename)?;
            return Ok(ChunkResult::End {
                filename: req.filename.clone(),
                total_size: file_size,
                checksum,
            });
        }

        let payload = self.read_chunk(&req.filename, req.seq)?;
        let sent_bytes = plan::bytes_sent_through(req.seq, self.chunk_size, file_size)?;
        Ok(ChunkResult::Chunk {
            filename: req.filename.clone(),
            seq: req.seq,
            payload,
            sent_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::io::Write;
    use std::path::Path;

    fn engine_with_root(root: &Path, chunk_size: u64) -> TransferEngine {
        TransferEngine::new(TransferConfig {
            storage_root: root.to_path_buf(),
            chunk_size,
        })
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(data).unwrap();
    }

    #[test]
    fn serves_chunks_then_end_with_checksum() {
        let dir = tempfile::tempdir().unwrap();
        // 1,000,000 bytes at a 500,000-byte chunk size: two full chunks.
        let data: Vec<u8> = (0..1_000_000u32).map(|i| (i % 239) as u8).collect();
        write_file(dir.path(), "big.bin", &data);
        let engine = engine_with_root(dir.path(), 500_000);

        let first = engine
            .process(&DownloadRequest::new("big.bin", 0))
            .unwrap();
        match &first {
            ChunkResult::Chunk {
                seq,
                payload,
                sent_bytes,
                ..
            } => {
                assert_eq!(*seq, 0);
                assert_eq!(payload.len(), 500_000);
                assert_eq!(payload[..], data[..500_000]);
                assert_eq!(*sent_bytes, 500_000);
            }
            other => panic!("expected chunk, got {other:?}"),
        }

        let second = engine
            .process(&DownloadRequest::new("big.bin", 1))
            .unwrap();
        match &second {
            ChunkResult::Chunk {
                payload,
                sent_bytes,
                ..
            } => {
                assert_eq!(payload[..], data[500_000..]);
                assert_eq!(*sent_bytes, 1_000_000);
            }
            other => panic!("expected chunk, got {other:?}"),
        }

        let end = engine
            .process(&DownloadRequest::new("big.bin", 2))
            .unwrap();
        match end {
            ChunkResult::End {
                total_size,
                checksum,
                ..
            } => {
                assert_eq!(total_size, 1_000_000);
                assert_eq!(checksum, hex::encode(Sha256::digest(&data)));
            }
            other => panic!("expected end, got {other:?}"),
        }
    }

    #[test]
    fn final_chunk_is_short() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "odd.bin", b"0123456789"); // 10 bytes
        let engine = engine_with_root(dir.path(), 4);

        let last = engine.process(&DownloadRequest::new("odd.bin", 2)).unwrap();
        match last {
            ChunkResult::Chunk {
                payload,
                sent_bytes,
                ..
            } => {
                assert_eq!(payload, b"89");
                assert_eq!(sent_bytes, 10);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn zero_byte_file_ends_immediately() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "empty.bin", b"");
        let engine = engine_with_root(dir.path(), 500_000);

        let result = engine
            .process(&DownloadRequest::new("empty.bin", 0))
            .unwrap();
        match result {
            ChunkResult::End {
                total_size,
                checksum,
                ..
            } => {
                assert_eq!(total_size, 0);
                assert_eq!(checksum, hex::encode(Sha256::digest([])));
            }
            other => panic!("expected end, got {other:?}"),
        }
    }

    #[test]
    fn wrong_request_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.bin", b"data");
        let engine = engine_with_root(dir.path(), 4);

        let mut req = DownloadRequest::new("a.bin", 0);
        req.kind = "upload".into();
        let err = engine.process(&req).unwrap_err();
        match err {
            TransferError::InvalidRequestType(kind) => assert_eq!(kind, "upload"),
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn traversal_filenames_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_root(dir.path(), 4);

        for name in ["../secret", "/etc/passwd", "a\\b", "", "  "] {
            let err = engine.process(&DownloadRequest::new(name, 0)).unwrap_err();
            assert!(
                matches!(err, TransferError::InvalidFilename),
                "{name:?} should be invalid"
            );
        }
    }

    #[test]
    fn missing_file_is_not_found_for_any_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_root(dir.path(), 4);

        for seq in [0, 1, 999] {
            let err = engine
                .process(&DownloadRequest::new("ghost.bin", seq))
                .unwrap_err();
            match err {
                TransferError::NotFound(name) => assert_eq!(name, "ghost.bin"),
                other => panic!("expected not found, got {other:?}"),
            }
        }
    }

    #[test]
    fn directory_is_not_a_servable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let engine = engine_with_root(dir.path(), 4);

        let err = engine
            .process(&DownloadRequest::new("subdir", 0))
            .unwrap_err();
        assert!(matches!(err, TransferError::NotFound(_)));
    }

    #[test]
    fn read_chunk_past_eof_is_invalid_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.bin", b"data");
        let engine = engine_with_root(dir.path(), 4);

        let err = engine.read_chunk("a.bin", 1).unwrap_err();
        assert!(matches!(err, TransferError::InvalidSequence { seq: 1, .. }));
    }

    #[test]
    fn zero_chunk_size_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_root(dir.path(), 0);
        assert_eq!(engine.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn result_converts_to_wire_response() {
        let chunk = ChunkResult::Chunk {
            filename: "a.bin".into(),
            seq: 2,
            payload: b"abc".to_vec(),
            sent_bytes: 11,
        };
        assert_eq!(
            DownloadResponse::from(chunk),
            DownloadResponse::chunk("a.bin", 2, b"abc".to_vec(), 11)
        );

        let end = ChunkResult::End {
            filename: "a.bin".into(),
            total_size: 11,
            checksum: "ff".repeat(32),
        };
        assert_eq!(
            DownloadResponse::from(end),
            DownloadResponse::end("a.bin", 11, "ff".repeat(32))
        );
    }
}
