use std::io;
use std::time::Duration;

use thiserror::Error;

/// Framing-level failures.
///
/// Everything except `Io` means the peer sent bytes that are not a valid
/// length-prefixed frame; the client recovers those locally instead of
/// propagating them.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("frame length {0} is not a valid payload size")]
    InvalidLength(i32),

    #[error("frame of {0} bytes exceeds the {1}-byte limit")]
    FrameTooLarge(usize, usize),

    #[error("response ended after {read} of {expected} payload bytes")]
    Truncated { read: usize, expected: usize },
}

/// Transport-level failures of one judge round trip.
///
/// These are the retryable class: the call never reached a decodable
/// response. Malformed responses never surface here; the client substitutes
/// a synthetic SystemError response for those.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to judge server at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: io::Error,
    },

    #[error("timed out connecting to judge server at {0}")]
    ConnectTimeout(String),

    #[error("I/O error talking to judge server: {0}")]
    Io(#[from] io::Error),

    #[error("no judge response within {0:?}")]
    Deadline(Duration),

    #[error("failed to encode judge request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("judge request of {0} bytes exceeds the frame limit")]
    RequestTooLarge(usize),
}
