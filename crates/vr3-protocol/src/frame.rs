//! Frame encoding/decoding utilities.
//!
//! Every message on the link is a length-prefixed frame bounded by two
//! sentinel bytes. `LEN` counts every byte after itself, the end sentinel
//! included, so a frame is always `LEN + 2` bytes long.
//!
//! ```text
//! plain:       | AA | n+2 | CMD |          payload[0..n] | 0A |
//! extended:    | AA | n+3 | CMD | SUBCMD | payload[0..n] | 0A |
//! header-only: | AA | n+1 |                payload[0..n] | 0A |
//! ```
//!
//! Sentinels are not escaped. A frame is delimited purely by its length
//! field, so payload bytes equal to `0x0A` or `0xAA` are legal anywhere.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::error::{FrameError, ProtocolError, TransportError};
use crate::types::{Opcode, RecordId};

/// Largest payload a plain frame can carry.
pub const MAX_PLAIN_PAYLOAD: usize = 255 - 2;
/// Largest payload an extended frame can carry.
pub const MAX_EXTENDED_PAYLOAD: usize = 255 - 3;
/// Largest payload a header-only frame can carry.
pub const MAX_RAW_PAYLOAD: usize = 255 - 1;

/// The three frame layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameShape {
    /// `CMD` + payload.
    Plain,
    /// `CMD` + `SUBCMD` + payload.
    Extended,
    /// Payload only, no command byte.
    HeaderOnly,
}

impl FrameShape {
    /// Bytes between `LEN` and the payload.
    const fn prefix_len(self) -> usize {
        match self {
            FrameShape::Plain => 1,
            FrameShape::Extended => 2,
            FrameShape::HeaderOnly => 0,
        }
    }

    const fn max_payload(self) -> usize {
        match self {
            FrameShape::Plain => MAX_PLAIN_PAYLOAD,
            FrameShape::Extended => MAX_EXTENDED_PAYLOAD,
            FrameShape::HeaderOnly => MAX_RAW_PAYLOAD,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn encode(prefix: &[u8], payload: &[u8], shape: FrameShape) -> Vec<u8> {
    debug_assert_eq!(prefix.len(), shape.prefix_len());
    debug_assert!(payload.len() <= shape.max_payload());

    let len = prefix.len() + payload.len() + 1;
    let mut buf = BytesMut::with_capacity(len + 2);
    buf.put_u8(FRAME_HEAD);
    buf.put_u8(len as u8);
    buf.put_slice(prefix);
    buf.put_slice(payload);
    buf.put_u8(FRAME_END);
    buf.to_vec()
}

fn check_payload(payload: &[u8], shape: FrameShape) -> Result<(), FrameError> {
    if payload.len() > shape.max_payload() {
        return Err(FrameError::PayloadTooLong {
            max: shape.max_payload(),
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Encode `HEAD, n+2, CMD, payload, END`.
pub fn encode_plain(cmd: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    check_payload(payload, FrameShape::Plain)?;
    Ok(encode(&[cmd], payload, FrameShape::Plain))
}

/// Encode `HEAD, n+3, CMD, SUBCMD, payload, END`.
pub fn encode_extended(cmd: u8, subcmd: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    check_payload(payload, FrameShape::Extended)?;
    Ok(encode(&[cmd, subcmd], payload, FrameShape::Extended))
}

/// Encode `HEAD, n+1, payload, END` (raw forwarding).
pub fn encode_raw(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    check_payload(payload, FrameShape::HeaderOnly)?;
    Ok(encode(&[], payload, FrameShape::HeaderOnly))
}

// ============================================================================
// Decoding
// ============================================================================

/// Validate the two header bytes and return the number of bytes still to
/// read (`LEN`).
///
/// `max_frame_len` bounds the total frame size; a declared length that
/// would exceed it is rejected before anything is allocated.
pub fn check_header(head: u8, len: u8, max_frame_len: usize) -> Result<usize, FrameError> {
    if head != FRAME_HEAD {
        return Err(FrameError::BadHead(head));
    }
    if len < MIN_LEN || usize::from(len) + 2 > max_frame_len {
        return Err(FrameError::BadLength(len));
    }
    Ok(usize::from(len))
}

/// A single received frame, head to end sentinel inclusive.
///
/// Frames own their bytes; nothing borrows a shared receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Validate a complete frame held in memory.
    pub fn from_wire(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < 2 {
            return Err(FrameError::ShortRead {
                expected: 2,
                received: data.len(),
                cause: TransportError::Closed,
            });
        }
        let len = check_header(data[0], data[1], MAX_FRAME_SIZE)?;
        if data.len() < len + 2 {
            return Err(FrameError::ShortRead {
                expected: len,
                received: data.len(),
                cause: TransportError::Closed,
            });
        }
        Self::from_validated(Bytes::copy_from_slice(&data[..len + 2]))
    }

    /// Check the trailer of a frame whose header already passed
    /// [`check_header`] and whose body has been read in full.
    pub(crate) fn from_validated(bytes: Bytes) -> Result<Self, FrameError> {
        let trailer = bytes[bytes.len() - 1];
        if trailer != FRAME_END {
            return Err(FrameError::BadTrailer(trailer));
        }
        Ok(Frame { bytes })
    }

    /// The value of the `LEN` field.
    #[inline]
    pub fn len_field(&self) -> u8 {
        self.bytes[1]
    }

    /// Total frame size on the wire (`LEN + 2`).
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.bytes.len()
    }

    /// The whole frame.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The raw command byte (first byte after `LEN`).
    #[inline]
    pub fn command_byte(&self) -> u8 {
        self.bytes[2]
    }

    /// The command byte as a known opcode.
    pub fn opcode(&self) -> Result<Opcode, ProtocolError> {
        Opcode::try_from(self.command_byte())
    }

    /// The subcommand byte, if the frame is long enough to have one.
    pub fn subcommand(&self) -> Option<u8> {
        (self.len_field() >= 3).then(|| self.bytes[3])
    }

    /// Payload of a plain frame (`LEN - 2` bytes after `CMD`).
    pub fn payload(&self) -> &[u8] {
        self.section(FrameShape::Plain)
    }

    /// Payload of an extended frame (`LEN - 3` bytes after `SUBCMD`).
    pub fn extended_payload(&self) -> &[u8] {
        self.section(FrameShape::Extended)
    }

    fn section(&self, shape: FrameShape) -> &[u8] {
        let start = 2 + shape.prefix_len();
        let end = self.bytes.len() - 1;
        if start > end {
            return &[];
        }
        &self.bytes[start..end]
    }
}

// ============================================================================
// Record Lists
// ============================================================================

/// Remove duplicate records, keeping the first occurrence of each.
///
/// The unique count is the length of the returned list. An empty input is an
/// error: every command built from a record list needs at least one target.
pub fn dedup_records(records: &[RecordId]) -> Result<Vec<RecordId>, FrameError> {
    if records.is_empty() {
        return Err(FrameError::EmptyInput);
    }
    let mut seen = [false; 256];
    let mut unique = Vec::with_capacity(records.len());
    for &record in records {
        if !seen[usize::from(record)] {
            seen[usize::from(record)] = true;
            unique.push(record);
        }
    }
    Ok(unique)
}

/// Autoload bitmap for a record list: bit `i` is set for the `i`-th listed
/// record. The bitmap tracks list position, not record value.
pub fn autoload_bitmap(count: usize) -> u8 {
    (0..count.min(8)).fold(0u8, |map, i| map | (1 << i))
}
