//! Request and response message types.
//!
//! Every message is a flat JSON object with the fields `type`, `filename`,
//! `seq`, `data`, and (responses only) `sentBytes`. The `data` field is
//! overloaded: base64 chunk bytes in a chunk response, the hex checksum in
//! an end response, a human-readable message in an error response, and
//! empty in requests.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{END_SEQ, TYPE_ERROR, TYPE_REQUEST, TYPE_RESPONSE};

/// A request for one chunk of a named file.
///
/// The `type` field is kept verbatim rather than parsed into an enum so a
/// wrong-typed request can be rejected with a diagnostic naming the value
/// the client actually sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    /// Zero-based chunk index. Negative wire values fail deserialization
    /// and are treated as malformed requests by the transport.
    pub seq: u64,
    /// Always empty in the download direction.
    #[serde(default)]
    pub data: String,
}

impl DownloadRequest {
    /// Creates a well-formed request for chunk `seq` of `filename`.
    pub fn new(filename: impl Into<String>, seq: u64) -> Self {
        Self {
            kind: TYPE_REQUEST.into(),
            filename: filename.into(),
            seq,
            data: String::new(),
        }
    }

    /// Returns `true` if the `type` field is the expected `"request"`.
    pub fn is_request(&self) -> bool {
        self.kind == TYPE_REQUEST
    }
}

/// A server reply: one chunk, the end of the transfer, or an error.
///
/// Modeled as a sum type so a chunk can never carry a checksum and an end
/// message can never carry payload bytes; the flat wire shape is produced
/// by the manual serde impls below.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadResponse {
    /// One chunk of file data (raw bytes here, base64 on the wire).
    Chunk {
        filename: String,
        seq: u64,
        payload: Vec<u8>,
        /// Bytes delivered through the end of this chunk.
        sent_bytes: u64,
    },
    /// Transfer complete; `seq` is [`END_SEQ`] on the wire.
    End {
        filename: String,
        total_size: u64,
        /// Lowercase hex SHA-256 of the whole file.
        checksum: String,
    },
    /// The request could not be served.
    Error { message: String },
}

impl DownloadResponse {
    /// Builds a chunk response.
    pub fn chunk(
        filename: impl Into<String>,
        seq: u64,
        payload: Vec<u8>,
        sent_bytes: u64,
    ) -> Self {
        Self::Chunk {
            filename: filename.into(),
            seq,
            payload,
            sent_bytes,
        }
    }

    /// Builds an end-of-transfer response carrying the file checksum.
    pub fn end(filename: impl Into<String>, total_size: u64, checksum: impl Into<String>) -> Self {
        Self::End {
            filename: filename.into(),
            total_size,
            checksum: checksum.into(),
        }
    }

    /// Builds an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// The flat five-field shape every response serializes to.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    #[serde(rename = "type")]
    kind: String,
    filename: String,
    seq: i64,
    data: String,
    sent_bytes: u64,
}

impl Serialize for DownloadResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            Self::Chunk {
                filename,
                seq,
                payload,
                sent_bytes,
            } => RawResponse {
                kind: TYPE_RESPONSE.into(),
                filename: filename.clone(),
                seq: *seq as i64,
                data: STANDARD.encode(payload),
                sent_bytes: *sent_bytes,
            },
            Self::End {
                filename,
                total_size,
                checksum,
            } => RawResponse {
                kind: TYPE_RESPONSE.into(),
                filename: filename.clone(),
                seq: END_SEQ,
                data: checksum.clone(),
                sent_bytes: *total_size,
            },
            Self::Error { message } => RawResponse {
                kind: TYPE_ERROR.into(),
                filename: String::new(),
                seq: END_SEQ,
                data: message.clone(),
                sent_bytes: 0,
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DownloadResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResponse::deserialize(deserializer)?;
        match raw.kind.as_str() {
            TYPE_ERROR => Ok(Self::Error { message: raw.data }),
            TYPE_RESPONSE if raw.seq == END_SEQ => Ok(Self::End {
                filename: raw.filename,
                total_size: raw.sent_bytes,
                checksum: raw.data,
            }),
            TYPE_RESPONSE if raw.seq >= 0 => {
                let payload = STANDARD.decode(&raw.data).map_err(serde::de::Error::custom)?;
                Ok(Self::Chunk {
                    filename: raw.filename,
                    seq: raw.seq as u64,
                    payload,
                    sent_bytes: raw.sent_bytes,
                })
            }
            TYPE_RESPONSE => Err(serde::de::Error::custom(format!(
                "invalid response seq: {}",
                raw.seq
            ))),
            other => Err(serde::de::Error::custom(format!(
                "unknown response type: {other}"
            ))),
        }
    }
}
