//! Protocol error types.

use std::io;

use thiserror::Error;

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No data arrived before the read gave up.
    #[error("timed out waiting for data")]
    TimedOut,

    /// The underlying link was closed.
    #[error("transport closed")]
    Closed,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => TransportError::Closed,
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Framing errors: a frame could not be sent, or the bytes read do not form
/// a valid frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The write primitive failed; the frame is considered not sent.
    #[error("write failed: {0}")]
    Write(TransportError),

    /// Fewer bytes than required arrived.
    ///
    /// `received == 0` means no frame started; anything more means a frame
    /// was cut off and its bytes are lost.
    #[error("short read: wanted {expected} bytes after {received} ({cause})")]
    ShortRead {
        /// Bytes the framer tried to read.
        expected: usize,
        /// Bytes of this frame already consumed before the failed read.
        received: usize,
        /// Why the read failed.
        cause: TransportError,
    },

    /// The first byte was not the head sentinel.
    #[error("bad head byte: 0x{0:02X}")]
    BadHead(u8),

    /// The declared length is below the minimum or above the frame limit.
    #[error("bad length field: {0}")]
    BadLength(u8),

    /// The byte at `LEN + 1` was not the end sentinel.
    #[error("bad trailer byte: 0x{0:02X}")]
    BadTrailer(u8),

    /// The payload does not fit in a frame.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Largest payload this frame shape can carry.
        max: usize,
        /// Payload length requested.
        actual: usize,
    },

    /// An operation that needs at least one record was given none.
    #[error("empty input")]
    EmptyInput,

    /// A record list contained the reserved all/none id.
    #[error("record 0x{0:02X} is reserved")]
    ReservedRecord(u8),
}

impl FrameError {
    /// Legacy negative return code for this error.
    pub fn code(&self) -> i32 {
        match self {
            FrameError::Write(_)
            | FrameError::ShortRead { .. }
            | FrameError::PayloadTooLong { .. }
            | FrameError::EmptyInput
            | FrameError::ReservedRecord(_) => -1,
            FrameError::BadHead(_) => -2,
            FrameError::BadLength(_) => -3,
            FrameError::BadTrailer(_) => -4,
        }
    }

    /// Whether the error only means "nothing arrived in time": the read
    /// timed out before the first byte of a frame.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::ShortRead {
                received: 0,
                cause: TransportError::TimedOut,
                ..
            }
        )
    }

    /// Whether a frame was started but not finished.
    pub fn is_truncated(&self) -> bool {
        matches!(self, FrameError::ShortRead { received, .. } if *received > 0)
    }
}

/// Errors decoding the contents of a structurally valid frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown command code.
    #[error("unknown command code: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Payload is shorter than its shape requires.
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// The `LEN` field does not match the fixed size of this response.
    #[error("unexpected length field: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedLength {
        /// Required `LEN` value.
        expected: u8,
        /// `LEN` value received.
        actual: u8,
    },

    /// Invalid data in the payload.
    #[error("invalid payload: {0}")]
    InvalidData(String),
}
