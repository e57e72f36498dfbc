use std::time::Duration;

/// `type` value of a download request.
pub const TYPE_REQUEST: &str = "request";

/// `type` value of a chunk or end-of-transfer response.
pub const TYPE_RESPONSE: &str = "response";

/// `type` value of an error response.
pub const TYPE_ERROR: &str = "error";

/// Sentinel `seq` marking the end of a transfer: no chunk body follows,
/// the `data` field carries the whole-file checksum instead.
pub const END_SEQ: i64 = -1;

/// Length of a hex-encoded SHA-256 checksum.
pub const CHECKSUM_HEX_LEN: usize = 64;

/// Maximum WebSocket message size in bytes (2 MB).
///
/// A 500 KiB chunk grows to ~683 KB under base64; 2 MB leaves headroom
/// for the envelope and for moderately larger configured chunk sizes.
pub const WS_MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// How often the server pings an idle connection.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(5);

/// Time to wait for a pong (or any incoming frame) before the connection
/// is considered dead. Set high enough to tolerate a slow full-file
/// checksum pass on the server side.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// Timeout for a single request/response round trip on the client side.
pub const WS_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
