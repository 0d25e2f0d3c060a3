//! Frame I/O over an abstract byte transport.
//!
//! The framer owns no retry policy of its own: whether a read blocks until
//! data arrives or gives up after a few attempts is decided by the
//! [`Transport`] for each call, through [`ReadMode`]. The framer never
//! scans forward to resynchronize a broken stream; after a structural error
//! the session should be closed and reopened.

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use log::{trace, warn};

use crate::clock::Clock;
use crate::constants::{FRAME_HEAD, MAX_FRAME_SIZE};
use crate::error::{FrameError, TransportError};
use crate::frame::{check_header, Frame};

/// How long a single read may wait for its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Keep retrying until the bytes arrive or the timeout expires.
    Blocking(Duration),
    /// Retry a small fixed number of times, then fail.
    Bounded,
}

/// Byte-level link to the module.
pub trait Transport {
    /// Write all of `data`. There is no partial-write contract beyond
    /// pass/fail.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Fill `buf` completely, or fail.
    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        (**self).read(buf, mode)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        (**self).read(buf, mode)
    }
}

/// What is left of a blocking read's timeout once `now - started` has passed.
fn remaining(mode: ReadMode, started: Duration, now: Duration) -> ReadMode {
    match mode {
        ReadMode::Blocking(timeout) => ReadMode::Blocking(timeout.saturating_sub(now.saturating_sub(started))),
        ReadMode::Bounded => ReadMode::Bounded,
    }
}

/// Sends and receives single frames over a [`Transport`].
#[derive(Debug)]
pub struct Framer<T> {
    transport: T,
    max_frame_len: usize,
}

impl<T: Transport> Framer<T> {
    /// Create a framer accepting frames up to [`MAX_FRAME_SIZE`].
    pub fn new(transport: T) -> Self {
        Framer {
            transport,
            max_frame_len: MAX_FRAME_SIZE,
        }
    }

    /// Create a framer with a tighter bound on received frame size.
    pub fn with_max_frame_len(transport: T, max_frame_len: usize) -> Self {
        Framer {
            transport,
            max_frame_len: max_frame_len.clamp(4, MAX_FRAME_SIZE),
        }
    }

    /// Largest frame `receive` will accept.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Write an already-encoded frame. No retry on failure.
    pub fn send_encoded(&mut self, frame: &[u8]) -> Result<(), FrameError> {
        trace!("tx frame: {}", hex::encode(frame));
        self.transport.write(frame).map_err(|e| {
            warn!("frame write failed: {}", e);
            FrameError::Write(e)
        })
    }

    /// Read exactly one frame.
    ///
    /// Reads the head byte, then `LEN`, validates them, then reads `LEN`
    /// more bytes and checks the end sentinel at `LEN + 1`. In blocking mode
    /// the timeout covers the whole frame: each read gets only what is left
    /// of it, measured on `clock`.
    ///
    /// A timeout before the head byte is a [`FrameError::ShortRead`] with
    /// `received == 0`; a frame cut off later reports how many of its bytes
    /// were consumed.
    pub fn receive<C: Clock + ?Sized>(&mut self, mode: ReadMode, clock: &C) -> Result<Frame, FrameError> {
        let started = clock.now();

        let mut head = [0u8; 1];
        self.transport.read(&mut head, mode).map_err(|cause| FrameError::ShortRead {
            expected: 1,
            received: 0,
            cause,
        })?;
        if head[0] != FRAME_HEAD {
            warn!("rejected frame head 0x{:02X}", head[0]);
            return Err(FrameError::BadHead(head[0]));
        }

        let mut len_field = [0u8; 1];
        self.transport
            .read(&mut len_field, remaining(mode, started, clock.now()))
            .map_err(|cause| {
                warn!("frame cut off after head: {}", cause);
                FrameError::ShortRead {
                    expected: 1,
                    received: 1,
                    cause,
                }
            })?;
        let len = check_header(head[0], len_field[0], self.max_frame_len).map_err(|e| {
            warn!("rejected frame header {:02X}{:02X}: {}", head[0], len_field[0], e);
            e
        })?;

        let mut buf = BytesMut::with_capacity(len + 2);
        buf.put_u8(head[0]);
        buf.put_u8(len_field[0]);
        buf.resize(len + 2, 0);
        self.transport
            .read(&mut buf[2..], remaining(mode, started, clock.now()))
            .map_err(|cause| {
                warn!("frame cut off after header {:02X}{:02X}: {}", head[0], len_field[0], cause);
                FrameError::ShortRead {
                    expected: len,
                    received: 2,
                    cause,
                }
            })?;

        let frame = Frame::from_validated(buf.freeze()).map_err(|e| {
            warn!("rejected frame: {}", e);
            e
        })?;
        trace!("rx frame: {}", hex::encode(frame.as_bytes()));
        Ok(frame)
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::constants::*;
    use crate::frame::{encode_extended, encode_plain};

    /// Clock shared between a test and its transport.
    #[derive(Clone, Default)]
    struct StepClock(Rc<Cell<Duration>>);

    impl Clock for StepClock {
        fn now(&self) -> Duration {
            self.0.get()
        }
    }

    /// Minimal in-memory transport. Each read takes `delay` on `clock`.
    #[derive(Default)]
    struct Loopback {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        fail_writes: bool,
        clock: StepClock,
        delay: Duration,
        modes: Vec<ReadMode>,
    }

    impl Transport for Loopback {
        fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Io("unplugged".into()));
            }
            self.outbound.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
            self.modes.push(mode);
            self.clock.0.set(self.clock.0.get() + self.delay);
            if self.inbound.len() < buf.len() {
                self.inbound.clear();
                return Err(TransportError::TimedOut);
            }
            for slot in buf.iter_mut() {
                *slot = self.inbound.pop_front().unwrap_or_default();
            }
            Ok(())
        }
    }

    fn framer_with(bytes: &[u8]) -> Framer<Loopback> {
        Framer::new(Loopback {
            inbound: bytes.iter().copied().collect(),
            ..Default::default()
        })
    }

    fn receive(framer: &mut Framer<Loopback>) -> Result<Frame, FrameError> {
        let clock = framer.transport().clock.clone();
        framer.receive(WAIT, &clock)
    }

    const WAIT: ReadMode = ReadMode::Blocking(Duration::from_millis(100));

    #[test]
    fn test_send_encoded_writes_frame() {
        let mut framer = framer_with(&[]);
        framer.send_encoded(&encode_plain(CMD_LOAD, &[1]).unwrap()).unwrap();
        assert_eq!(framer.transport().outbound, vec![0xAA, 0x03, 0x30, 0x01, 0x0A]);
    }

    #[test]
    fn test_send_reports_write_failure() {
        let mut framer = Framer::new(Loopback {
            fail_writes: true,
            ..Default::default()
        });
        let err = framer.send_encoded(&encode_plain(CMD_CLEAR, &[]).unwrap()).unwrap_err();
        assert!(matches!(err, FrameError::Write(_)));
    }

    #[test]
    fn test_receive_valid_frame() {
        let mut framer = framer_with(&[0xAA, 0x04, 0x30, 0x01, 0x02, 0x0A]);
        let frame = receive(&mut framer).unwrap();
        assert_eq!(frame.wire_len(), 6);
        assert_eq!(frame.payload(), &[0x01, 0x02]);
    }

    #[test]
    fn test_receive_nothing_is_timeout() {
        let mut framer = framer_with(&[]);
        let err = receive(&mut framer).unwrap_err();
        assert_eq!(
            err,
            FrameError::ShortRead {
                expected: 1,
                received: 0,
                cause: TransportError::TimedOut
            }
        );
        assert!(err.is_timeout());
        assert!(!err.is_truncated());
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_receive_short_header_is_truncated() {
        let mut framer = framer_with(&[0xAA]);
        let err = receive(&mut framer).unwrap_err();
        assert_eq!(
            err,
            FrameError::ShortRead {
                expected: 1,
                received: 1,
                cause: TransportError::TimedOut
            }
        );
        assert!(!err.is_timeout());
        assert!(err.is_truncated());
    }

    #[test]
    fn test_receive_bad_head() {
        let mut framer = framer_with(&[0x55, 0x02, 0x31, 0x0A]);
        assert_eq!(receive(&mut framer), Err(FrameError::BadHead(0x55)));
        assert_eq!(framer.transport().modes.len(), 1);
    }

    #[test]
    fn test_receive_bad_length() {
        let mut framer = framer_with(&[0xAA, 0x01, 0x0A]);
        let err = receive(&mut framer).unwrap_err();
        assert_eq!(err, FrameError::BadLength(0x01));
        assert_eq!(err.code(), -3);
    }

    #[test]
    fn test_receive_bad_trailer() {
        let mut framer = framer_with(&[0xAA, 0x03, 0x31, 0x00, 0x0B]);
        let err = receive(&mut framer).unwrap_err();
        assert_eq!(err, FrameError::BadTrailer(0x0B));
        assert_eq!(err.code(), -4);
    }

    #[test]
    fn test_receive_short_body() {
        let mut framer = framer_with(&[0xAA, 0x05, 0x30, 0x01]);
        let err = receive(&mut framer).unwrap_err();
        assert!(matches!(err, FrameError::ShortRead { expected: 5, received: 2, .. }));
        assert!(err.is_truncated());
    }

    #[test]
    fn test_receive_shares_one_timeout() {
        let mut framer = Framer::new(Loopback {
            inbound: encode_plain(CMD_CLEAR, &[]).unwrap().into_iter().collect(),
            delay: Duration::from_millis(30),
            ..Default::default()
        });
        receive(&mut framer).unwrap();
        assert_eq!(
            framer.transport().modes,
            vec![
                ReadMode::Blocking(Duration::from_millis(100)),
                ReadMode::Blocking(Duration::from_millis(70)),
                ReadMode::Blocking(Duration::from_millis(40)),
            ]
        );
    }

    #[test]
    fn test_receive_budget_never_underflows() {
        let mut framer = Framer::new(Loopback {
            inbound: encode_plain(CMD_CLEAR, &[]).unwrap().into_iter().collect(),
            delay: Duration::from_millis(60),
            ..Default::default()
        });
        receive(&mut framer).unwrap();
        assert_eq!(framer.transport().modes[2], ReadMode::Blocking(Duration::ZERO));
    }

    #[test]
    fn test_receive_respects_max_frame_len() {
        let mut payload = vec![0u8; 40];
        payload[0] = 1;
        let bytes = encode_plain(CMD_LOAD, &payload).unwrap();
        let mut framer = Framer::with_max_frame_len(
            Loopback {
                inbound: bytes.iter().copied().collect(),
                ..Default::default()
            },
            32,
        );
        assert_eq!(receive(&mut framer), Err(FrameError::BadLength(42)));
    }

    #[test]
    fn test_receive_back_to_back_frames() {
        let mut bytes = encode_plain(CMD_CLEAR, &[]).unwrap();
        bytes.extend(encode_extended(CMD_CHECK_SIGNATURE, 4, &[2, b'o', b'n']).unwrap());
        let mut framer = framer_with(&bytes);

        let first = receive(&mut framer).unwrap();
        assert_eq!(first.command_byte(), CMD_CLEAR);
        let second = receive(&mut framer).unwrap();
        assert_eq!(second.subcommand(), Some(4));
        assert_eq!(second.extended_payload(), &[2, b'o', b'n']);
    }
}
