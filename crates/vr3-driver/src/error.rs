//! Error types for the command engine.

use thiserror::Error;
use vr3_protocol::{FrameError, Opcode, ProtocolError};

/// Errors returned by [`VoiceRecognizer`](crate::VoiceRecognizer)
/// operations.
///
/// Status bytes the module reports inside a payload (recognizer full,
/// record untrained, ...) are not errors; they come back in the decoded
/// report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Sending failed, nothing arrived in time, or the bytes did not form a
    /// frame.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A well-formed frame carried a payload that could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The response carried a different command byte than the request.
    #[error("expected {expected} response, got command 0x{actual:02X}")]
    CommandMismatch {
        /// Opcode of the request.
        expected: Opcode,
        /// Command byte received.
        actual: u8,
    },

    /// The module answered with an error frame.
    #[error("module rejected {command}: error code 0x{code:02X}")]
    Rejected {
        /// Opcode of the request.
        command: Opcode,
        /// Error code from the module.
        code: u8,
    },

    /// A query-all exchange went idle before a single frame arrived.
    #[error("no response frames before the idle window elapsed")]
    NoResponse,

    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The recognizer could not be cleared at startup; the session refuses
    /// further operations.
    #[error("session halted: module could not be cleared")]
    SessionHalted,
}

impl EngineError {
    /// Legacy negative return code.
    ///
    /// Check-train command mismatches are -3 and an empty query-all is -2;
    /// framing errors keep their own codes; everything else is -1.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Frame(e) => e.code(),
            EngineError::CommandMismatch { expected, .. } if *expected == Opcode::CheckTrain => -3,
            EngineError::NoResponse => -2,
            _ => -1,
        }
    }

    /// Whether the error only means no frame started in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Frame(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vr3_protocol::TransportError;

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::Frame(FrameError::BadHead(0)).code(), -2);
        assert_eq!(EngineError::Frame(FrameError::BadLength(1)).code(), -3);
        assert_eq!(EngineError::Frame(FrameError::BadTrailer(0)).code(), -4);
        assert_eq!(
            EngineError::CommandMismatch {
                expected: Opcode::Load,
                actual: 0x31
            }
            .code(),
            -1
        );
        assert_eq!(
            EngineError::CommandMismatch {
                expected: Opcode::CheckTrain,
                actual: 0x31
            }
            .code(),
            -3
        );
        assert_eq!(EngineError::NoResponse.code(), -2);
        assert_eq!(EngineError::SessionHalted.code(), -1);
    }

    #[test]
    fn test_is_timeout() {
        let timeout = EngineError::Frame(FrameError::ShortRead {
            expected: 1,
            received: 0,
            cause: TransportError::TimedOut,
        });
        assert!(timeout.is_timeout());
        assert!(!EngineError::NoResponse.is_timeout());

        let cut_off = EngineError::Frame(FrameError::ShortRead {
            expected: 9,
            received: 2,
            cause: TransportError::TimedOut,
        });
        assert!(!cut_off.is_timeout());
        assert_eq!(cut_off.code(), -1);
    }
}
