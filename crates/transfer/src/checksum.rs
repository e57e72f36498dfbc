//! Whole-file integrity checksum.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::TransferError;

/// Read buffer for the digest pass (8 KiB).
const DIGEST_BUF_SIZE: usize = 8192;

/// Computes the SHA-256 of an entire file, returned as lowercase hex.
///
/// Streams through a fixed-size buffer so arbitrarily large files never
/// land in memory at once.
pub fn file_sha256(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; DIGEST_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// SHA-256 of empty input.
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_file_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::File::create(&path).unwrap();
        assert_eq!(file_sha256(&path).unwrap(), EMPTY_SHA256);
    }

    #[test]
    fn digest_matches_in_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        // Larger than one read buffer so the loop runs more than once.
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&data)
            .unwrap();

        let expected = hex::encode(Sha256::digest(&data));
        assert_eq!(file_sha256(&path).unwrap(), expected);
    }

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        std::fs::write(&path, b"x").unwrap();
        let digest = file_sha256(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = file_sha256(&dir.path().join("nope.bin"));
        assert!(matches!(result, Err(TransferError::Io(_))));
    }
}
